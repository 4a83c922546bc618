use lazy_static::lazy_static;
use regex::Regex;

use crate::models::domain::DnsRecord;

lazy_static! {
    // Labels of 1–63 alphanumerics/hyphens, not starting or ending with a hyphen,
    // at least one dot.
    static ref DOMAIN_RE: Regex = Regex::new(
        r"^(?i)(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$"
    )
    .unwrap();
}

/// Syntactic check of a fully-qualified domain name. No DNS lookup.
pub fn is_valid_domain(name: &str) -> bool {
    name.len() <= 253 && DOMAIN_RE.is_match(name)
}

/// One-line rendering for listings, e.g. `MX @ -> mail.example.com (priority 10, TTL 3600)`.
pub fn format_dns_record(record: &DnsRecord) -> String {
    let name = if record.name.is_empty() { "@" } else { record.name.as_str() };
    let mut line = format!("{} {} -> {}", record.record_type, name, record.value);

    let mut extras = Vec::new();
    if let Some(priority) = record.priority {
        extras.push(format!("priority {priority}"));
    }
    if let Some(ttl) = record.ttl {
        extras.push(format!("TTL {ttl}"));
    }
    if !extras.is_empty() {
        line.push_str(&format!(" ({})", extras.join(", ")));
    }
    line
}

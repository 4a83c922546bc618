//! Operator CLI for the Vercel domains API
//!
//! Reads VERCEL_API_TOKEN / VERCEL_TEAM_ID / VERCEL_API_BASE_URL from the
//! environment (or .env).
//!
//! Usage: domains <COMMAND>
//!   domains check example.com
//!   domains records example.com
//!   domains add-record example.com --type TXT --name _verify --value abc

use clap::{Parser, Subcommand};

use console_api::{
    models::domain::{DnsRecord, DnsRecordType},
    services::{
        dns::{format_dns_record, is_valid_domain},
        domains::{VercelClient, DEFAULT_BASE_URL},
    },
};

#[derive(Parser)]
#[command(name = "domains", about = "Manage registrar domains and DNS records")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a domain can be bought
    Check { name: String },
    /// Buy a domain
    Buy {
        name: String,
        #[arg(long, default_value_t = 1)]
        years: u32,
    },
    /// List domains on the account
    List,
    /// Show one domain
    Show { name: String },
    /// List DNS records of a domain
    Records { name: String },
    /// Create a DNS record
    AddRecord {
        name: String,
        #[arg(long = "type")]
        record_type: DnsRecordType,
        #[arg(long = "name", default_value = "")]
        record_name: String,
        #[arg(long)]
        value: String,
        #[arg(long)]
        ttl: Option<u32>,
        #[arg(long)]
        priority: Option<u32>,
    },
    /// Delete a DNS record
    DeleteRecord { name: String, record_id: String },
    /// Ask the registrar to verify a domain
    Verify { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let args = Args::parse();

    let token = std::env::var("VERCEL_API_TOKEN")
        .map_err(|_| anyhow::anyhow!("VERCEL_API_TOKEN environment variable not set"))?;
    let team_id = std::env::var("VERCEL_TEAM_ID").ok();
    let base_url =
        std::env::var("VERCEL_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let client = VercelClient::new(token, team_id).with_base_url(base_url);

    match args.command {
        Command::Check { name } => {
            ensure_valid(&name)?;
            let a = client.check_availability(&name).await?;
            match (a.available, a.price) {
                (true, Some(price)) => println!("{name} is available (${price:.2})"),
                (true, None) => println!("{name} is available"),
                (false, _) => println!("{name} is taken"),
            }
        }
        Command::Buy { name, years } => {
            ensure_valid(&name)?;
            let purchase = client.purchase_domain(&name, years).await?;
            println!("Purchased {}", purchase.domain.name);
        }
        Command::List => {
            for d in client.list_domains().await? {
                let verified = if d.verified { "verified" } else { "unverified" };
                let day = |t: Option<chrono::DateTime<chrono::Utc>>| {
                    t.map(|t| t.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".into())
                };
                println!(
                    "{:<40} {:<11} created {} expires {}",
                    d.name,
                    verified,
                    day(d.created()),
                    day(d.expires())
                );
            }
        }
        Command::Show { name } => {
            ensure_valid(&name)?;
            let d = client.get_domain(&name).await?;
            println!("{}", serde_json::to_string_pretty(&d)?);
        }
        Command::Records { name } => {
            ensure_valid(&name)?;
            for r in client.get_dns_records(&name).await? {
                println!("{:<28} {}", r.id.as_deref().unwrap_or("-"), format_dns_record(&r));
            }
        }
        Command::AddRecord {
            name,
            record_type,
            record_name,
            value,
            ttl,
            priority,
        } => {
            ensure_valid(&name)?;
            let record = DnsRecord {
                id: None,
                record_type,
                name: record_name,
                value,
                ttl,
                priority,
            };
            let created = client.create_dns_record(&name, &record).await?;
            println!(
                "Created {} ({})",
                format_dns_record(&created),
                created.id.as_deref().unwrap_or("-")
            );
        }
        Command::DeleteRecord { name, record_id } => {
            ensure_valid(&name)?;
            client.delete_dns_record(&name, &record_id).await?;
            println!("Deleted {record_id}");
        }
        Command::Verify { name } => {
            ensure_valid(&name)?;
            let v = client.verify_domain(&name).await?;
            if v.verified {
                println!("{name} is verified");
            } else {
                println!("{name} is not verified yet");
                if let Some(txt) = v.txt_record {
                    println!("Add TXT record: {txt}");
                }
            }
        }
    }

    Ok(())
}

fn ensure_valid(name: &str) -> anyhow::Result<()> {
    if is_valid_domain(name) {
        Ok(())
    } else {
        anyhow::bail!("Invalid domain name: {name}")
    }
}

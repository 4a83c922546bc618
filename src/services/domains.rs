use std::time::Instant;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use crate::models::domain::{
    Acknowledged, Availability, DnsRecord, DnsRecordPatch, Domain, Purchase, Verification,
};
use crate::services::metrics;

pub const DEFAULT_BASE_URL: &str = "https://api.vercel.com";

#[derive(Debug, thiserror::Error)]
pub enum DomainApiError {
    /// Upstream answered with a non-2xx status. `message` starts with the
    /// status text, followed by the upstream error message when there is one.
    #[error("{operation} failed: {message}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        message: String,
    },
    #[error("{operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned an unexpected body: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl DomainApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DomainApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct DomainEnvelope {
    domain: Domain,
}

#[derive(Deserialize)]
struct DomainsEnvelope {
    #[serde(default)]
    domains: Vec<Domain>,
}

#[derive(Deserialize)]
struct RecordsEnvelope {
    #[serde(default)]
    records: Vec<DnsRecord>,
}

#[derive(Deserialize)]
struct CreatedRecord {
    uid: String,
}

#[derive(Deserialize)]
struct StatusBody {
    available: bool,
    #[serde(default)]
    price: Option<f64>,
}

#[derive(Deserialize)]
struct PriceBody {
    price: f64,
}

/// Stateless client for the Vercel domains API.
///
/// One request per call: no retries, no caching, no timeout beyond what the
/// underlying `reqwest::Client` has. When a team id is set it is sent as the
/// `teamId` query parameter on every request.
#[derive(Clone)]
pub struct VercelClient {
    http: Client,
    base_url: String,
    token: String,
    team_id: Option<String>,
}

impl VercelClient {
    pub fn new(token: impl Into<String>, team_id: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            team_id: team_id.filter(|t| !t.is_empty()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }

    pub async fn check_availability(&self, name: &str) -> Result<Availability, DomainApiError> {
        const OP: &str = "checkAvailability";
        let req = self
            .request(Method::GET, "/v4/domains/status")
            .query(&[("name", name)]);
        let body: StatusBody = Self::json(OP, self.send(OP, req).await?).await?;

        let mut price = body.price;
        if body.available && price.is_none() {
            price = self.price(name).await;
        }
        Ok(Availability {
            available: body.available,
            price,
        })
    }

    /// Price lookup is informational; failures leave the price unset.
    async fn price(&self, name: &str) -> Option<f64> {
        const OP: &str = "getPrice";
        let req = self
            .request(Method::GET, "/v4/domains/price")
            .query(&[("name", name)]);
        let result = match self.send(OP, req).await {
            Ok(response) => Self::json::<PriceBody>(OP, response).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(p) => Some(p.price),
            Err(e) => {
                tracing::debug!("Price lookup for {} skipped: {}", name, e);
                None
            }
        }
    }

    pub async fn purchase_domain(&self, name: &str, years: u32) -> Result<Purchase, DomainApiError> {
        const OP: &str = "purchaseDomain";
        let req = self
            .request(Method::POST, "/v5/domains/buy")
            .json(&json!({ "name": name, "years": years.max(1) }));
        let body: DomainEnvelope = Self::json(OP, self.send(OP, req).await?).await?;
        tracing::info!("Purchased domain {} for {} year(s)", name, years.max(1));
        Ok(Purchase {
            success: true,
            domain: body.domain,
        })
    }

    pub async fn add_domain(&self, project_id: &str, name: &str) -> Result<Acknowledged, DomainApiError> {
        const OP: &str = "addDomain";
        let req = self
            .request(Method::POST, &format!("/v10/projects/{project_id}/domains"))
            .json(&json!({ "name": name }));
        self.send(OP, req).await?;
        Ok(Acknowledged { success: true })
    }

    pub async fn list_domains(&self) -> Result<Vec<Domain>, DomainApiError> {
        const OP: &str = "listDomains";
        let req = self.request(Method::GET, "/v5/domains");
        let body: DomainsEnvelope = Self::json(OP, self.send(OP, req).await?).await?;
        Ok(body.domains)
    }

    pub async fn get_domain(&self, name: &str) -> Result<Domain, DomainApiError> {
        const OP: &str = "getDomain";
        let req = self.request(Method::GET, &format!("/v5/domains/{name}"));
        let body: DomainEnvelope = Self::json(OP, self.send(OP, req).await?).await?;
        Ok(body.domain)
    }

    pub async fn get_dns_records(&self, name: &str) -> Result<Vec<DnsRecord>, DomainApiError> {
        const OP: &str = "getDNSRecords";
        let req = self.request(Method::GET, &format!("/v4/domains/{name}/records"));
        let body: RecordsEnvelope = Self::json(OP, self.send(OP, req).await?).await?;
        Ok(body.records)
    }

    /// Creates a record; the returned copy carries the registrar-assigned id.
    pub async fn create_dns_record(
        &self,
        name: &str,
        record: &DnsRecord,
    ) -> Result<DnsRecord, DomainApiError> {
        const OP: &str = "createDNSRecord";
        let mut payload = record.clone();
        payload.id = None;
        let req = self
            .request(Method::POST, &format!("/v2/domains/{name}/records"))
            .json(&payload);
        let created: CreatedRecord = Self::json(OP, self.send(OP, req).await?).await?;
        payload.id = Some(created.uid);
        Ok(payload)
    }

    pub async fn update_dns_record(
        &self,
        _name: &str,
        record_id: &str,
        patch: &DnsRecordPatch,
    ) -> Result<DnsRecord, DomainApiError> {
        const OP: &str = "updateDNSRecord";
        let req = self
            .request(Method::PATCH, &format!("/v1/domains/records/{record_id}"))
            .json(patch);
        let mut updated: DnsRecord = Self::json(OP, self.send(OP, req).await?).await?;
        if updated.id.is_none() {
            updated.id = Some(record_id.to_string());
        }
        Ok(updated)
    }

    pub async fn delete_dns_record(&self, name: &str, record_id: &str) -> Result<bool, DomainApiError> {
        const OP: &str = "deleteDNSRecord";
        let req = self.request(
            Method::DELETE,
            &format!("/v2/domains/{name}/records/{record_id}"),
        );
        self.send(OP, req).await?;
        Ok(true)
    }

    pub async fn transfer_domain(
        &self,
        name: &str,
        auth_code: &str,
    ) -> Result<Acknowledged, DomainApiError> {
        const OP: &str = "transferDomain";
        let req = self.request(Method::POST, "/v4/domains").json(&json!({
            "name": name,
            "method": "transfer-in",
            "authCode": auth_code,
        }));
        self.send(OP, req).await?;
        Ok(Acknowledged { success: true })
    }

    pub async fn update_nameservers(
        &self,
        name: &str,
        nameservers: &[String],
    ) -> Result<bool, DomainApiError> {
        const OP: &str = "updateNameservers";
        let req = self
            .request(Method::PATCH, &format!("/v3/domains/{name}"))
            .json(&json!({ "nameservers": nameservers }));
        self.send(OP, req).await?;
        Ok(true)
    }

    /// A non-2xx answer means "not verified yet" and is returned as such,
    /// with the TXT value the registrar expects when the body names one.
    /// Only transport failures are errors.
    pub async fn verify_domain(&self, name: &str) -> Result<Verification, DomainApiError> {
        const OP: &str = "verifyDomain";
        let started = Instant::now();
        let response = self
            .request(Method::POST, &format!("/v4/domains/{name}/verify"))
            .send()
            .await
            .map_err(|source| DomainApiError::Transport { operation: OP, source })?;
        let status = response.status();
        metrics::record_domain_call(OP, status.as_str(), started.elapsed().as_secs_f64());

        if status.is_success() {
            return Ok(Verification {
                verified: true,
                txt_record: None,
            });
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let txt_record = extract_txt_record(&body);
        tracing::debug!("Domain {} not verified yet ({})", name, status);
        Ok(Verification {
            verified: false,
            txt_record,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token);
        if let Some(team_id) = &self.team_id {
            req = req.query(&[("teamId", team_id)]);
        }
        req
    }

    async fn send(&self, operation: &'static str, req: RequestBuilder) -> Result<Response, DomainApiError> {
        let started = Instant::now();
        let response = req
            .send()
            .await
            .map_err(|source| DomainApiError::Transport { operation, source })?;
        let status = response.status();
        metrics::record_domain_call(operation, status.as_str(), started.elapsed().as_secs_f64());

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        tracing::warn!("Vercel {} error {}: {}", operation, status, text);
        let status_text = status.canonical_reason().unwrap_or("Unknown Status");
        let message = match upstream_message(&text) {
            Some(detail) => format!("{status_text}: {detail}"),
            None => status_text.to_string(),
        };
        Err(DomainApiError::Status {
            operation,
            status,
            message,
        })
    }

    async fn json<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> Result<T, DomainApiError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|source| DomainApiError::Transport { operation, source })?;
        serde_json::from_slice(&bytes).map_err(|e| DomainApiError::Decode {
            operation,
            message: e.to_string(),
        })
    }
}

/// `{"error": {"message": "..."}}` is the registrar's error envelope.
fn upstream_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn extract_txt_record(body: &Value) -> Option<String> {
    let direct = body
        .pointer("/error/txtRecord")
        .or_else(|| body.get("txtRecord"))
        .and_then(Value::as_str);
    if let Some(txt) = direct {
        return Some(txt.to_string());
    }

    body.pointer("/error/verification")
        .or_else(|| body.get("verification"))
        .and_then(Value::as_array)
        .and_then(|entries| {
            entries.iter().find_map(|entry| {
                let is_txt = entry
                    .get("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t.eq_ignore_ascii_case("TXT"));
                if is_txt {
                    entry.get("value").and_then(Value::as_str).map(str::to_string)
                } else {
                    None
                }
            })
        })
}

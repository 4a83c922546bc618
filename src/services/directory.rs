use std::future::Future;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::{auth::ContactKey, client::ClientRecord};

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Identity lookup transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Identity lookup failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error("Identity lookup returned errors: {0}")]
    Graphql(String),
}

/// Backend queries that turn a partial identity into a client record.
///
/// `Ok(None)` means the backend answered but knows no such client.
pub trait IdentityDirectory: Send + Sync + 'static {
    fn find_by_id(
        &self,
        token: &str,
        client_id: &str,
    ) -> impl Future<Output = Result<Option<ClientRecord>, LookupError>> + Send;

    fn find_by_contact(
        &self,
        token: &str,
        contact: &ContactKey,
    ) -> impl Future<Output = Result<Option<ClientRecord>, LookupError>> + Send;
}

const CLIENT_FIELDS: &str = "id email phoneNumber firstName lastName companyName tenantId role";

/// Identity lookups over the console's GraphQL backend.
#[derive(Clone)]
pub struct GraphqlDirectory {
    client: Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

impl GraphqlDirectory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn query(
        &self,
        token: &str,
        field: &str,
        query: String,
        variables: Value,
    ) -> Result<Option<ClientRecord>, LookupError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("GraphQL {} lookup error {}: {}", field, status, text);
            return Err(LookupError::Status(status));
        }

        let body: GraphqlResponse = response.json().await?;
        if !body.errors.is_empty() {
            let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(LookupError::Graphql(messages.join("; ")));
        }

        let record = body
            .data
            .and_then(|mut d| d.get_mut(field).map(Value::take))
            .filter(|v| !v.is_null());
        match record {
            Some(v) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| LookupError::Graphql(format!("unexpected {field} shape: {e}"))),
            None => Ok(None),
        }
    }
}

impl IdentityDirectory for GraphqlDirectory {
    async fn find_by_id(
        &self,
        token: &str,
        client_id: &str,
    ) -> Result<Option<ClientRecord>, LookupError> {
        let query = format!(
            "query GetClient($id: ID!) {{ getClient(id: $id) {{ {CLIENT_FIELDS} }} }}"
        );
        self.query(token, "getClient", query, json!({ "id": client_id }))
            .await
    }

    async fn find_by_contact(
        &self,
        token: &str,
        contact: &ContactKey,
    ) -> Result<Option<ClientRecord>, LookupError> {
        let query = format!(
            "query GetClientByEmailOrPhone($email: String, $phoneNumber: String) {{ \
             getClientByEmailOrPhone(email: $email, phoneNumber: $phoneNumber) {{ {CLIENT_FIELDS} }} }}"
        );
        let variables = match contact {
            ContactKey::Email(email) => json!({ "email": email }),
            ContactKey::Phone(phone) => json!({ "phoneNumber": phone }),
        };
        self.query(token, "getClientByEmailOrPhone", query, variables)
            .await
    }
}

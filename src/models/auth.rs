use serde::{Deserialize, Serialize};

/// Claims carried by the console session token.
///
/// The token is issued by the GraphQL backend; only these fields are read here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

impl SessionClaims {
    /// Drops empty-string identity claims so they count as absent.
    pub fn normalized(mut self) -> Self {
        fn keep(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        self.client_id = keep(self.client_id);
        self.email = keep(self.email);
        self.phone_number = keep(self.phone_number);
        self.tenant_id = keep(self.tenant_id);
        self
    }
}

/// Identity keys captured from a decoded token, in precedence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityKeys {
    pub client_id: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl From<&SessionClaims> for IdentityKeys {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            client_id: claims.client_id.clone(),
            email: claims.email.clone(),
            phone_number: claims.phone_number.clone(),
        }
    }
}

/// The lookup a resolution should issue next.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupStrategy {
    ById(String),
    ByContact(ContactKey),
}

/// Contact key for the email-or-phone lookup. Exactly one is ever sent.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactKey {
    Email(String),
    Phone(String),
}

impl IdentityKeys {
    /// `clientId` wins; otherwise email, then phone.
    pub fn strategy(&self) -> Option<LookupStrategy> {
        if let Some(id) = &self.client_id {
            return Some(LookupStrategy::ById(id.clone()));
        }
        if let Some(email) = &self.email {
            return Some(LookupStrategy::ByContact(ContactKey::Email(email.clone())));
        }
        self.phone_number
            .as_ref()
            .map(|phone| LookupStrategy::ByContact(ContactKey::Phone(phone.clone())))
    }

    /// Clears the id key after a failed id lookup so precedence falls through.
    pub fn without_client_id(&self) -> Self {
        Self {
            client_id: None,
            ..self.clone()
        }
    }
}

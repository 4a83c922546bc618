use serde::{Deserialize, Serialize};

/// Client record returned by the identity lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl ClientRecord {
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(n), None) | (None, Some(n)) => n.clone(),
            (None, None) => self
                .email
                .clone()
                .or_else(|| self.phone_number.clone())
                .unwrap_or_else(|| self.id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ClientRecord {
        serde_json::from_value(serde_json::json!({ "id": "c1" })).unwrap()
    }

    #[test]
    fn display_name_prefers_full_name() {
        let mut c = record();
        c.first_name = Some("Ada".into());
        c.last_name = Some("Lovelace".into());
        assert_eq!(c.display_name(), "Ada Lovelace");
        c.last_name = None;
        assert_eq!(c.display_name(), "Ada");
    }

    #[test]
    fn display_name_falls_back_to_contact_then_id() {
        let mut c = record();
        assert_eq!(c.display_name(), "c1");
        c.phone_number = Some("+15550100".into());
        assert_eq!(c.display_name(), "+15550100");
        c.email = Some("a@b.com".into());
        assert_eq!(c.display_name(), "a@b.com");
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::client::ClientRecord;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Unresolved,
    Resolving,
    Resolved,
    /// The token decoded but no lookup produced a client.
    Failed,
    Anonymous,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionPhase::Unresolved => "unresolved",
            SessionPhase::Resolving => "resolving",
            SessionPhase::Resolved => "resolved",
            SessionPhase::Failed => "failed",
            SessionPhase::Anonymous => "anonymous",
        };
        write!(f, "{s}")
    }
}

/// Observable session state, serialized as-is to the console front end.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub is_authenticated: bool,
    pub user: Option<ClientRecord>,
    pub loading: bool,
    pub phase: SessionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            loading: true,
            phase: SessionPhase::Unresolved,
            resolved_at: None,
            error: None,
        }
    }
}

impl SessionState {
    /// State after teardown (logout or undecodable token).
    pub fn signed_out() -> Self {
        Self {
            loading: false,
            phase: SessionPhase::Anonymous,
            ..Self::default()
        }
    }
}

//! Caller identity for one inbound request.

use serde::Serialize;

/// Identity resolved by the auth layer in front of the gateway.
///
/// Trusted as given; the gateway never validates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
    pub user_email: Option<String>,
}

impl RequestContext {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

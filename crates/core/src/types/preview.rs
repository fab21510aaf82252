use serde::{Deserialize, Serialize};

/// Who can reach a preview URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewVisibility {
    /// Anyone with the URL.
    Public,
    /// Requires a minted token, enforced by the platform's ingress.
    Private,
}

/// Requested shape of a network preview.
///
/// `port` must be a member of the owning sandbox's declared port set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSpec {
    pub name: String,
    pub port: u16,
    pub visibility: PreviewVisibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Server-side record of a preview, including its resulting URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRecord {
    #[serde(flatten)]
    pub spec: PreviewSpec,
    pub url: String,
}

/// A token granting access to a private preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewToken {
    pub value: String,
    /// Unix timestamp (seconds) after which the token stops working.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

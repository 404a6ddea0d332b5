use serde::{Deserialize, Serialize};

/// Caller identity injected by the auth middleware.
///
/// The id is opaque; it comes from the identity provider's token subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
}

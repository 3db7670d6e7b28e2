// Database models - Users and Plaud connections
use serde::{Deserialize, Serialize};

/// A local user owning recordings and provider configs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

/// The remote account credential a user synchronizes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaudConnection {
    pub user_id: String,
    #[serde(skip_serializing)]
    pub bearer_token: String,
    /// Server region key ("global" or "eu")
    pub server: String,
    /// Restrict sync to one device serial, None mirrors every device
    pub device_sn: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

//! Records kept in the shared message store.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessageDto {
    pub display_name: String,
    pub body: String,
    pub instance_id: String,
    /// Unix epoch milliseconds (UTC)
    pub created_at: i64,
}

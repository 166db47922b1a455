use serde::{Deserialize, Serialize};

/// A single AWS account id / region pair. In practice there is one
/// implicit account per instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub region: String,
}

impl Default for Account {
    fn default() -> Self {
        Account {
            id: "000000000000".to_string(),
            region: "us-east-1".to_string(),
        }
    }
}

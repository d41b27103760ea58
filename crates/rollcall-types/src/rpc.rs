use serde::{Deserialize, Serialize};

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub const USER_NOT_FOUND: &str = "user not found";
pub const INVALID_JSON: &str = "invalid JSON data";
pub const USER_DELETED: &str = "user deleted";
pub const MIRROR_FAILED: &str = "Failed to store data in Google Sheets";

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeSessionResult {
    pub daemon_pid: u32,
    pub bind: String,
    pub records: usize,
    pub mirror_enabled: bool,
}

// ============================================================================
// Shutdown
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownResult {
    pub status: String,
}

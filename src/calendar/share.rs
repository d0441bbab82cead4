use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    Read,
    Write,
}

impl SharePermission {
    pub fn as_str(self) -> &'static str {
        match self {
            SharePermission::Read => "read",
            SharePermission::Write => "write",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ShareStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShareStatus::Pending => "pending",
            ShareStatus::Accepted => "accepted",
            ShareStatus::Rejected => "rejected",
        }
    }
}

/// The effective role a requester holds on a calendar once access has been
/// resolved. Ownership always maps to `Owner`, regardless of what permission
/// a share grant declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRole {
    Owner,
    Writer,
    Reader,
}

impl AccessRole {
    pub fn can_write(self) -> bool {
        matches!(self, AccessRole::Owner | AccessRole::Writer)
    }
}

/// A share grant: permission for one invited email to reach one calendar.
/// Not a copy of the calendar itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarShare {
    pub id: String,
    pub owner_id: String,
    pub calendar_id: String,
    pub shared_with_email: String,
    /// Backfilled the first time the invited user reaches the share.
    pub shared_with_id: Option<String>,
    pub permission: SharePermission,
    /// Bearer capability for the share link. Unique and unguessable.
    pub share_token: String,
    pub status: ShareStatus,
    pub calendar_name: String,
}

impl CalendarShare {
    pub fn new(
        owner_id: &str,
        calendar_id: &str,
        shared_with_email: &str,
        shared_with_id: Option<String>,
        permission: SharePermission,
        calendar_name: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            calendar_id: calendar_id.to_string(),
            shared_with_email: shared_with_email.trim().to_lowercase(),
            shared_with_id,
            permission,
            share_token: generate_share_token(),
            status: ShareStatus::Pending,
            calendar_name: calendar_name.trim().to_string(),
        }
    }
}

/// How a caller names the calendar it wants to act on. Owned calendars and
/// share links live in different identifier namespaces, so the distinction is
/// carried explicitly instead of being sniffed from the string shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CalendarRef {
    Own { id: String },
    Shared { token: String },
}

/// 32 random bytes, hex-encoded: 256 bits of entropy behind each share link.
pub fn generate_share_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

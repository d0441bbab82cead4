pub mod service;

use thiserror::Error;

use crate::calendar::{AccessRole, CalendarShare, User};
use crate::storage::StoreError;

pub use service::{AccessService, ShareRequest};

#[derive(Debug, Error)]
pub enum AccessError {
    /// No identity at all; distinct from a known identity lacking rights.
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("access to this calendar is denied")]
    Forbidden,
    /// Also returned when an ownership predicate filtered the record out, so
    /// existence does not leak.
    #[error("calendar not found")]
    NotFound,
    /// The share still exists but its owner account is gone; callers may
    /// want to offer cleanup instead of a generic failure.
    #[error("the owner of this calendar no longer exists")]
    OwnerMissing,
    #[error("this calendar is already shared with {0}")]
    AlreadyShared(String),
    #[error("a calendar cannot be shared with its owner")]
    SelfShare,
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The outcome of resolving a calendar reference for a requester: which
/// calendar, whose events, and at what effective role.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessGrant {
    pub calendar_id: String,
    pub owner_id: String,
    pub role: AccessRole,
    /// Present when access came through a share link.
    pub share: Option<CalendarShare>,
}

impl AccessGrant {
    pub fn can_write(&self) -> bool {
        self.role.can_write()
    }
}

/// Identity lookups as provided by the auth collaborator. The store doubles
/// as the directory in a single-process deployment.
#[cfg_attr(test, mockall::automock)]
pub trait UserDirectory {
    fn user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

impl UserDirectory for crate::storage::Store {
    fn user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Self::user_by_id(self, id)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Self::user_by_email(self, email)
    }
}

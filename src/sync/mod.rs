pub mod coordinator;

pub use coordinator::{LocalEvent, SyncCoordinator, SyncError, SyncReport};

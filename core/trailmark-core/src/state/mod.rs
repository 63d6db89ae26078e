//! Shared sink state: async lock + snapshot store.

pub mod lock;
mod store;
pub mod types;

pub use lock::{Access, AsyncLock, LockStatus, Releaser};
pub use store::{ReadAccess, SharedState, StateStore, WriteAccess};
pub use types::{EnvironmentSnapshot, Location, ScreenSnapshot, SessionSnapshot};

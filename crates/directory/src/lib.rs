//! In-memory user and group directory
//!
//! Users and groups live in a single [`DirectoryStore`]. Group membership is
//! stored only on the group side; a user's `groups` list is derived on every
//! read by scanning the member sequences, so the two views cannot disagree.

pub mod errors;
pub mod store;
pub mod types;

pub use errors::*;
pub use store::DirectoryStore;
pub use types::*;

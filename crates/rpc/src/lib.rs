//! HTTP interface for the user and group directory
//!
//! Routes translate requests into [`dirsvc_directory::DirectoryStore`] calls
//! and map the outcome back to status codes and bodies.

pub mod server;
pub mod validation;

pub use server::{build_router, start_server, ApiError, AppState, SharedState};
pub use validation::{
    validate_group_form, validate_member_list, validate_user_form, ValidationError,
};

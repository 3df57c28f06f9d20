//! Error types for the directory store

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("User not found: {userid}")]
    UserNotFound { userid: String },

    #[error("User already exists: {userid}")]
    UserAlreadyExists { userid: String },

    #[error("Group not found: {name}")]
    GroupNotFound { name: String },

    #[error("Group {name} already exists")]
    GroupAlreadyExists { name: String },
}

impl DirectoryError {
    /// The operation referenced a user or group that is not stored.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DirectoryError::UserNotFound { .. } | DirectoryError::GroupNotFound { .. }
        )
    }

    /// A create targeted a key that is already present.
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            DirectoryError::UserAlreadyExists { .. } | DirectoryError::GroupAlreadyExists { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DirectoryError>;

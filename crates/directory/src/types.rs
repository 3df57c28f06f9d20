//! Types for the user and group directory

use serde::{Deserialize, Serialize};

/// Caller-chosen user identifier
pub type UserId = String;

/// Unique group name
pub type GroupName = String;

/// Stored user record; carries no group membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub first_name: String,
    pub last_name: String,
    pub userid: UserId,
}

/// User as returned to callers, with membership derived from the groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub userid: UserId,
    pub groups: Vec<GroupName>,
}

impl User {
    pub(crate) fn from_record(record: &UserRecord, groups: Vec<GroupName>) -> Self {
        Self {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            userid: record.userid.clone(),
            groups,
        }
    }
}

/// Input for creating or replacing a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub userid: UserId,
    /// Groups to join; missing groups are created on the fly
    pub groups: Vec<GroupName>,
}

impl NewUser {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        userid: impl Into<String>,
        groups: Vec<GroupName>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            userid: userid.into(),
            groups,
        }
    }

    pub(crate) fn record(&self) -> UserRecord {
        UserRecord {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            userid: self.userid.clone(),
        }
    }
}

/// Body returned when a group is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: GroupName,
}

/// Point-in-time counts over the directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStats {
    pub users: usize,
    pub groups: usize,
    /// Total length of all member sequences, duplicates included
    pub memberships: usize,
}

//! Directory store implementation
//!
//! Owns the user and group relations behind one lock. Every operation
//! validates before it mutates, so a failed call leaves both maps untouched.

use crate::errors::*;
use crate::types::*;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct DirectoryState {
    /// userid → stored record
    users: BTreeMap<UserId, UserRecord>,
    /// group name → ordered member sequence
    groups: BTreeMap<GroupName, Vec<UserId>>,
}

impl DirectoryState {
    fn derive_groups(&self, userid: &str) -> Vec<GroupName> {
        self.groups
            .iter()
            .filter(|(_, members)| members.iter().any(|member| member == userid))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn user_view(&self, userid: &str) -> Option<User> {
        self.users
            .get(userid)
            .map(|record| User::from_record(record, self.derive_groups(userid)))
    }

    fn insert_user(&mut self, user: &NewUser) {
        debug!("Created user {}", user.userid);
        self.users.insert(user.userid.clone(), user.record());

        for group in &user.groups {
            let members = self.groups.entry(group.clone()).or_insert_with(|| {
                debug!("Created group {}", group);
                Vec::new()
            });
            debug!("Adding user {} to group {}", user.userid, group);
            members.push(user.userid.clone());
        }
    }

    fn remove_user(&mut self, userid: &str) {
        debug!("Deleted user {}", userid);
        self.users.remove(userid);

        for (name, members) in self.groups.iter_mut() {
            let before = members.len();
            members.retain(|member| member != userid);
            if members.len() != before {
                debug!("Removed user {} from group {}", userid, name);
            }
        }
    }
}

/// Shared handle to the in-memory directory.
///
/// Cloning is cheap; all clones see the same users and groups.
#[derive(Debug, Clone, Default)]
pub struct DirectoryStore {
    state: Arc<RwLock<DirectoryState>>,
}

impl DirectoryStore {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a user with its derived group membership
    pub fn get_user(&self, userid: &str) -> Result<User> {
        self.state
            .read()
            .user_view(userid)
            .ok_or_else(|| DirectoryError::UserNotFound {
                userid: userid.to_string(),
            })
    }

    /// Create a user and append it to every named group, creating missing groups
    pub fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write();
        if state.users.contains_key(&user.userid) {
            return Err(DirectoryError::UserAlreadyExists {
                userid: user.userid,
            });
        }

        state.insert_user(&user);
        state
            .user_view(&user.userid)
            .ok_or(DirectoryError::UserNotFound {
                userid: user.userid,
            })
    }

    /// Delete `existing` and create `user` in its place.
    ///
    /// `user.userid` may differ from `existing`. It is not checked against
    /// other stored users; a colliding record is overwritten and the memberships
    /// it already had remain in the groups.
    pub fn replace_user(&self, existing: &str, user: NewUser) -> Result<User> {
        let mut state = self.state.write();
        if !state.users.contains_key(existing) {
            return Err(DirectoryError::UserNotFound {
                userid: existing.to_string(),
            });
        }

        state.remove_user(existing);
        state.insert_user(&user);
        state
            .user_view(&user.userid)
            .ok_or(DirectoryError::UserNotFound {
                userid: user.userid,
            })
    }

    /// Delete a user and strip its id from every member sequence.
    ///
    /// Groups are kept even when this leaves them empty.
    pub fn delete_user(&self, userid: &str) -> Result<()> {
        let mut state = self.state.write();
        if !state.users.contains_key(userid) {
            return Err(DirectoryError::UserNotFound {
                userid: userid.to_string(),
            });
        }

        state.remove_user(userid);
        Ok(())
    }

    /// Member sequence of a group, in stored order
    pub fn get_group(&self, name: &str) -> Result<Vec<UserId>> {
        self.state
            .read()
            .groups
            .get(name)
            .cloned()
            .ok_or_else(|| DirectoryError::GroupNotFound {
                name: name.to_string(),
            })
    }

    /// Create an empty group
    pub fn create_group(&self, name: &str) -> Result<Group> {
        let mut state = self.state.write();
        if state.groups.contains_key(name) {
            return Err(DirectoryError::GroupAlreadyExists {
                name: name.to_string(),
            });
        }

        debug!("Created group {}", name);
        state.groups.insert(name.to_string(), Vec::new());
        Ok(Group {
            name: name.to_string(),
        })
    }

    /// Overwrite a group's member sequence verbatim.
    ///
    /// Members are neither deduplicated nor checked against stored users.
    pub fn replace_group_members(&self, name: &str, members: Vec<UserId>) -> Result<Vec<UserId>> {
        let mut state = self.state.write();
        let slot = state
            .groups
            .get_mut(name)
            .ok_or_else(|| DirectoryError::GroupNotFound {
                name: name.to_string(),
            })?;

        debug!("Replaced user data for group {}", name);
        *slot = members;
        Ok(slot.clone())
    }

    /// Remove a group. User records are never touched.
    pub fn delete_group(&self, name: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.groups.remove(name).is_none() {
            return Err(DirectoryError::GroupNotFound {
                name: name.to_string(),
            });
        }

        debug!("Deleted group {}", name);
        Ok(())
    }

    pub fn contains_user(&self, userid: &str) -> bool {
        self.state.read().users.contains_key(userid)
    }

    pub fn contains_group(&self, name: &str) -> bool {
        self.state.read().groups.contains_key(name)
    }

    /// Counts taken under a single read lock
    pub fn stats(&self) -> DirectoryStats {
        let state = self.state.read();
        DirectoryStats {
            users: state.users.len(),
            groups: state.groups.len(),
            memberships: state.groups.values().map(Vec::len).sum(),
        }
    }
}

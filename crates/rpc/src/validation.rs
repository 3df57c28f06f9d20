//! Request body validation
//!
//! Shape checks that run before any directory operation. Each function takes
//! the raw request body and returns either the typed input or a
//! [`ValidationError`] whose message is sent back verbatim.

use dirsvc_directory::{GroupName, NewUser, UserId};
use serde_json::{Map, Value};
use thiserror::Error;

const USER_FIELDS: [&str; 4] = ["first_name", "last_name", "userid", "groups"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No JSON request body sent.")]
    MissingBody,

    #[error("Malformed user entity")]
    MalformedUser,

    #[error("Groups is not a list")]
    GroupsNotList,

    #[error("User id must not be empty")]
    EmptyUserId,

    #[error("No name parameter sent.")]
    MissingGroupName,

    #[error("Request body not a list.")]
    MembersNotList,

    #[error("Member list must contain user ids.")]
    InvalidMember,
}

/// Validate a user entity with all four fields present.
pub fn validate_user_form(body: &[u8]) -> Result<NewUser, ValidationError> {
    let form = parse_object(body)?;

    if !USER_FIELDS.iter().all(|field| form.contains_key(*field)) {
        return Err(ValidationError::MalformedUser);
    }

    let groups = match &form["groups"] {
        Value::Array(items) => items,
        _ => return Err(ValidationError::GroupsNotList),
    };
    let groups = groups
        .iter()
        .map(|group| group.as_str().map(str::to_string))
        .collect::<Option<Vec<GroupName>>>()
        .ok_or(ValidationError::MalformedUser)?;

    let first_name = string_field(&form, "first_name")?;
    let last_name = string_field(&form, "last_name")?;
    let userid = string_field(&form, "userid")?;
    if userid.is_empty() {
        return Err(ValidationError::EmptyUserId);
    }

    Ok(NewUser {
        first_name,
        last_name,
        userid,
        groups,
    })
}

/// Validate a group creation body and return the requested name.
pub fn validate_group_form(body: &[u8]) -> Result<GroupName, ValidationError> {
    let form = parse_object(body)?;
    match form.get("name") {
        Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
        _ => Err(ValidationError::MissingGroupName),
    }
}

/// Validate a replacement member list.
pub fn validate_member_list(body: &[u8]) -> Result<Vec<UserId>, ValidationError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| ValidationError::MembersNotList)?;
    let Value::Array(items) = value else {
        return Err(ValidationError::MembersNotList);
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(userid) => Ok(userid),
            _ => Err(ValidationError::InvalidMember),
        })
        .collect()
}

fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ValidationError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(form)) if !form.is_empty() => Ok(form),
        _ => Err(ValidationError::MissingBody),
    }
}

fn string_field(form: &Map<String, Value>, field: &str) -> Result<String, ValidationError> {
    form.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ValidationError::MalformedUser)
}

//! User and Pool Schemas
//!
//! ## Relations
//!
//! - `User -[owns]-> Pool`
//! - `User -[participates {paid}]-> Pool`, `paid` defaulting to 0
//! - `User -[friendRequest]-> User`, pending until accepted
//! - `User -[friendOf]-> User`, read in either direction

use crate::models::{Lifecycle, PropertyDef, PropertyType, Schema, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const USER: &str = "User";
pub const POOL: &str = "Pool";

const EMAIL_PATTERN: &str = r"\S+@\S+\.\S+";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// OAuth token kept on a user; stored as a JSON string in the `tokens` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    pub kind: String,
    pub access_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset_expires: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    /// Name if set, email otherwise
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }

    pub fn add_token(&mut self, token: &AuthToken) -> Result<(), serde_json::Error> {
        self.tokens.push(serde_json::to_string(token)?);
        Ok(())
    }

    /// Decoded tokens; entries that are not valid token JSON are skipped
    pub fn auth_tokens(&self) -> Vec<AuthToken> {
        self.tokens
            .iter()
            .filter_map(|raw| serde_json::from_str(raw).ok())
            .collect()
    }

    /// Copy without credentials, safe to hand to other users
    pub fn redacted(&self) -> Self {
        Self {
            password: None,
            password_reset_token: None,
            password_reset_expires: None,
            tokens: Vec::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl Pool {
    pub fn new(name: impl Into<String>, private: bool) -> Self {
        Self {
            name: Some(name.into()),
            private: Some(private),
            ..Default::default()
        }
    }
}

/// Schema for [`User`]
///
/// Emails are unique, lowercased on save and on `find_one` lookups.
pub fn user_schema() -> Result<Schema, regex::Error> {
    let string = || PropertyDef::new(PropertyType::String);

    let mut schema = Schema::new([
        (
            "email",
            string().lowercase().required().unique().index().pattern(EMAIL_PATTERN)?,
        ),
        ("password", string()),
        ("passwordResetToken", string()),
        ("passwordResetExpires", PropertyType::Date.into()),
        ("tokens", PropertyType::List.into()),
        ("facebook", string()),
        ("twitter", string()),
        ("google", string()),
        ("name", string()),
        ("gender", string().one_of(["Male", "Female"])),
        ("location", string()),
        ("picture", string()),
    ]);

    schema.link("owns", POOL);
    schema.link("friendRequest", USER);
    schema.link("friendOf", USER);
    schema.relate(
        "participates",
        POOL,
        [(
            "paid",
            PropertyDef::new(PropertyType::Number).default_value(Value::from(0)),
        )],
    );

    schema.pre(Lifecycle::FindOne, |ctx| {
        if let Some(Value::String(email)) = ctx.properties.as_deref_mut().and_then(|m| m.get_mut("email")) {
            *email = email.to_lowercase();
        }
        Ok(())
    });

    Ok(schema)
}

/// Schema for [`Pool`]
pub fn pool_schema() -> Schema {
    Schema::new([
        ("name", PropertyDef::new(PropertyType::String)),
        ("private", PropertyType::Boolean.into()),
        ("location", PropertyType::String.into()),
        ("picture", PropertyType::String.into()),
    ])
}

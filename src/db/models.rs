//! Registrant models
//!
//! - `Registrant`: a stored row, also the API representation
//! - `RegistrantFields`: caller input for create and full replace
//! - `NewRegistrant`: validated INSERT / full UPDATE values
//! - `RegistrantPatch`: partial UPDATE; its fields are the only columns a
//!   caller can touch

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::schema::registrants;
use crate::error::{Result, WaitlistError};

/// Current UTC timestamp as RFC 3339 text
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Registrant row from SELECT query
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = registrants)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Registrant {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub status: String,
    pub channel: String,
    pub registered_at: String,
}

/// Validated registrant values for INSERT or full replace
#[derive(Debug, Clone, PartialEq, Eq, Insertable, AsChangeset)]
#[diesel(table_name = registrants)]
pub struct NewRegistrant {
    pub name: String,
    pub phone: String,
    pub status: String,
    pub channel: String,
    pub registered_at: String,
}

/// Request body for POST and PUT
///
/// Every field is optional at the parsing stage so that missing fields can be
/// reported together instead of failing on the first one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrantFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub registered_at: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl RegistrantFields {
    /// Check that every required field is present and non-empty
    pub fn validate(self) -> Result<NewRegistrant> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("status", &self.status),
            ("channel", &self.channel),
            ("registeredAt", &self.registered_at),
        ]
        .into_iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(field, _)| field)
        .collect();

        if !missing.is_empty() {
            return Err(WaitlistError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(NewRegistrant {
            name: self.name.unwrap_or_default(),
            phone: self.phone.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            channel: self.channel.unwrap_or_default(),
            registered_at: self.registered_at.unwrap_or_default(),
        })
    }
}

/// Request body for PATCH
///
/// Unknown keys are rejected at deserialization, so a caller can never name
/// a column outside this struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, AsChangeset)]
#[diesel(table_name = registrants)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegistrantPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub registered_at: Option<String>,
}

impl RegistrantPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.status.is_none()
            && self.channel.is_none()
            && self.registered_at.is_none()
    }

    /// Reject an empty patch and blank values for supplied fields
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(WaitlistError::Validation("no fields to update".to_string()));
        }

        let blank: Vec<&str> = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("status", &self.status),
            ("channel", &self.channel),
            ("registeredAt", &self.registered_at),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_some() && is_blank(value))
        .map(|(field, _)| field)
        .collect();

        if !blank.is_empty() {
            return Err(WaitlistError::Validation(format!(
                "fields must not be empty: {}",
                blank.join(", ")
            )));
        }
        Ok(())
    }
}

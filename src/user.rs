use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Roles the generator draws from and the form offers.
///
/// Stored roles are free-form strings; nothing rejects a role outside this list.
pub const ROLES: [&str; 4] = ["Admin", "User", "Editor", "Viewer"];

/// A single user record
///
/// Field names are serialized in camelCase so the persisted blob keeps the
/// `createdAt` key the browser application wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque unique identifier (UUID v4 for generated and form-created users)
    pub id: String,

    /// Full display name
    pub name: String,

    /// Email address
    pub email: String,

    /// Role tag, e.g. "Admin"
    pub role: String,

    /// Creation time, persisted as an ISO-8601 string
    #[serde(with = "iso_timestamp")]
    pub created_at: DateTime<Utc>,

    /// Password in plaintext, exactly as entered
    pub password: String,

    /// Whether the account is active
    pub active: bool,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,
}

impl User {
    pub fn has_valid_coordinates(&self) -> bool {
        valid_coordinates(self.latitude, self.longitude)
    }

    /// Link to the detail view for this user.
    pub fn detail_path(&self) -> String {
        format!("/users/{}", self.id)
    }
}

pub fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix.
///
/// Reading accepts any RFC 3339 offset and normalizes it to UTC.
pub mod iso_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| D::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

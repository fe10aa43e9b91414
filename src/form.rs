use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::generator::{random_coordinates, random_id};
use crate::user::User;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Values submitted from the "new user" form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUserForm {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub role: String,

    #[serde(default)]
    pub active: bool,
}

/// Per-field validation messages, keyed by form field name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, String>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    fn insert(&mut self, field: &'static str, message: &str) {
        self.0.entry(field).or_insert_with(|| message.to_string());
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl NewUserForm {
    /// Validate every field at once.
    ///
    /// Validation happens on submit only; the caller blocks submission until
    /// this returns `Ok`.
    ///
    /// # Returns
    /// * `Ok(())` when all rules pass
    /// * `Err(FormErrors)` with one message per failing field
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        if self.name.trim().is_empty() {
            errors.insert("name", "Name is required");
        }

        if self.email.trim().is_empty() {
            errors.insert("email", "Email is required");
        } else if !EMAIL_REGEX.is_match(self.email.trim()) {
            errors.insert("email", "Enter a valid email address");
        }

        if self.password.is_empty() {
            errors.insert("password", "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert("password", "Password must be at least 6 characters");
        }

        if self.role.trim().is_empty() {
            errors.insert("role", "Role is required");
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Build the record for a validated form.
    ///
    /// Assigns a fresh id, stamps `now` as the creation time and places the user
    /// at random valid coordinates.
    pub fn into_user<R: Rng + ?Sized>(self, rng: &mut R, now: DateTime<Utc>) -> User {
        let (latitude, longitude) = random_coordinates(rng);
        User {
            id: random_id(rng),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            role: self.role.trim().to_string(),
            created_at: now.trunc_subsecs(3),
            password: self.password,
            active: self.active,
            latitude,
            longitude,
        }
    }

    /// Validate and, if everything passes, build the record.
    pub fn submit<R: Rng + ?Sized>(self, rng: &mut R, now: DateTime<Utc>) -> Result<User, FormErrors> {
        self.validate()?;
        Ok(self.into_user(rng, now))
    }
}

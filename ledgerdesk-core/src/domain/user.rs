//! User domain model

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::validation::{is_blank, ValidationErrors};

/// A back-office user (account owner / contact)
///
/// Serialized with the collaborator's field names so the same struct goes
/// over the wire and into JSON output unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    pub email: String,
    #[serde(rename = "telefono", default)]
    pub phone: String,
    #[serde(rename = "fechaRegistro", default, with = "super::dates::optional")]
    pub registered_at: Option<DateTime<Utc>>,
    #[serde(rename = "rol", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "estado", default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }

    /// Case-insensitive match against name, surname and email
    pub fn matches(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.name.to_lowercase().contains(&q)
            || self.surname.to_lowercase().contains(&q)
            || self.email.to_lowercase().contains(&q)
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, patch: &UserPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(surname) = &patch.surname {
            self.surname = surname.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            self.phone = phone.clone();
        }
        if let Some(role) = &patch.role {
            self.role = Some(role.clone());
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
    }

    /// Validate the editable fields of an existing record
    pub fn validate(&self) -> ValidationErrors {
        validate_fields(&self.name, &self.surname, &self.email, &self.phone)
    }
}

/// User creation form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDraft {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "apellido")]
    pub surname: String,
    pub email: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(rename = "rol", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserDraft {
    pub fn validate(&self) -> ValidationErrors {
        validate_fields(&self.name, &self.surname, &self.email, &self.phone)
    }

    /// Build the record as stored, stamping the registration date
    pub fn into_user(self, id: i64, registered_at: DateTime<Utc>) -> User {
        User {
            id: Some(id),
            name: self.name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            registered_at: Some(registered_at),
            role: self.role,
            active: true,
        }
    }
}

/// Partial user update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "apellido", skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefono", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "rol", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "estado", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self == &UserPatch::default()
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("static email pattern"))
}

fn validate_fields(name: &str, surname: &str, email: &str, phone: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if is_blank(name) {
        errors.insert("nombre", "El nombre es obligatorio");
    }
    if is_blank(surname) {
        errors.insert("apellido", "El apellido es obligatorio");
    }
    if is_blank(email) {
        errors.insert("email", "El email es obligatorio");
    } else if !email_pattern().is_match(email) {
        errors.insert("email", "El email no es válido");
    }
    if is_blank(phone) {
        errors.insert("telefono", "El teléfono es obligatorio");
    }

    errors
}

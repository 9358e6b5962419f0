/// Shared data structures for the content catalog
///
/// These structs represent the data model that flows between the database
/// layer, the HTTP API and the admin forms. Records carry the server-assigned
/// `_id` and `createdAt`; the `New*` payloads are what forms submit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crop::data_url::DataUrl;
use crate::error::ValidationError;

/// A portfolio project card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Cropped image as a data URL
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// A client testimonial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
    pub description: String,
    pub designation: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// A contact form submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "_id")]
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

/// A newsletter subscriber. Emails are unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubscription {
    #[serde(default)]
    pub email: String,
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(trimmed.to_string())
}

fn required_email(value: &str) -> Result<String, ValidationError> {
    required(value, "email").map(|email| email.to_lowercase())
}

/// Images are stored as-is but must at least look like a data URL
fn required_image(value: &str) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Missing("image"));
    }
    if !value.starts_with("data:image/") || DataUrl::decoded_len_hint(value).is_none() {
        return Err(ValidationError::NotAnImage("image"));
    }
    Ok(value.to_string())
}

impl NewProject {
    /// Trim text fields and reject missing ones
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required(&self.name, "name")?,
            description: required(&self.description, "description")?,
            image: required_image(&self.image)?,
        })
    }
}

impl NewClient {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: required(&self.name, "name")?,
            description: required(&self.description, "description")?,
            designation: required(&self.designation, "designation")?,
            image: required_image(&self.image)?,
        })
    }
}

impl NewContact {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            full_name: required(&self.full_name, "fullName")?,
            email: required_email(&self.email)?,
            mobile: required(&self.mobile, "mobile")?,
            city: required(&self.city, "city")?,
        })
    }
}

impl NewSubscription {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            email: required_email(&self.email)?,
        })
    }
}

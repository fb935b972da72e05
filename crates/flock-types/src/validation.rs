use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use crate::api::{
    CreateGroupRequest, CreatePostRequest, CreateUserRequest, CreateVisualContentRequest,
    UpdateGroupRequest, UpdateUserRequest,
};
use crate::models::MediaType;

static MIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z]+/[a-z0-9+.\-]+$").expect("MIME pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    require("email", email)?;
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ValidationError::invalid("email", "must look like name@domain")),
    }
}

fn check_birth_date(month: u32, day: u32) -> Result<(), ValidationError> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::invalid("birthMonth", "must be between 1 and 12"));
    }
    if !(1..=31).contains(&day) {
        return Err(ValidationError::invalid("birthDay", "must be between 1 and 31"));
    }
    Ok(())
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("username", &self.username)?;
        require("password", &self.password)?;
        check_email(&self.email)?;
        check_birth_date(self.birth_month, self.birth_day)
    }
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        if let Some(password) = &self.password {
            require("password", password)?;
        }
        check_birth_date(self.birth_month.unwrap_or(1), self.birth_day.unwrap_or(1))
    }
}

impl CreatePostRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("textContent", &self.text_content)
    }
}

impl CreateGroupRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("description", &self.description)?;
        require("creator", &self.creator)?;
        for member in &self.members {
            require("members.username", &member.username)?;
        }
        Ok(())
    }
}

impl UpdateGroupRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        if let Some(description) = &self.description {
            require("description", description)?;
        }
        Ok(())
    }
}

impl CreateVisualContentRequest {
    /// Checks the payload and returns the media category to store, derived
    /// from the MIME type when the client did not send one.
    pub fn validate(&self) -> Result<MediaType, ValidationError> {
        require("content", &self.content)?;
        require("mimeType", &self.mime_type)?;
        if !MIME_RE.is_match(self.mime_type.trim()) {
            return Err(ValidationError::invalid(
                "mimeType",
                "must look like \"type/subtype\", e.g. image/png",
            ));
        }
        if self.width == Some(0) {
            return Err(ValidationError::invalid("width", "must be at least 1"));
        }
        if self.height == Some(0) {
            return Err(ValidationError::invalid("height", "must be at least 1"));
        }
        if self.duration_sec.is_some_and(|d| !(d >= 0.0)) {
            return Err(ValidationError::invalid("durationSec", "must not be negative"));
        }
        Ok(self
            .media_type
            .unwrap_or_else(|| MediaType::from_mime(self.mime_type.trim())))
    }
}

/// Parses a search date bound. Accepts RFC 3339 timestamps or plain
/// `YYYY-MM-DD` dates (interpreted as midnight UTC).
pub fn parse_date_bound(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
        .ok_or_else(|| ValidationError::invalid(field, format!("'{}' is not a valid date", raw)))
}

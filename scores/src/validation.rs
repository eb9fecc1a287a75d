//! Form schemas. Checked before anything is sent to the network.

use serde::Deserialize;
use session::Credentials;

use crate::error::ValidationError;
use crate::types::ScoreInput;

const LOCATION_MIN_CHARS: usize = 2;
const COMPENSATION_MIN: f64 = 1.0;

/// Raw salary form fields, as posted by a browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreForm {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub compensation: String,
    #[serde(default)]
    pub total_xp: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company_xp: String,
    /// Checkbox: present (any value but `false`/`off`) when ticked.
    #[serde(default)]
    pub consent: Option<String>,
}

impl ScoreForm {
    /// # Errors
    ///
    /// Every failing field, in form order.
    pub fn validate(&self) -> Result<ScoreInput, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let location = self.location.trim();
        if location.chars().count() < LOCATION_MIN_CHARS {
            errors.push(ValidationError::new("location", "Location is required"));
        }

        let compensation = parse_number(&self.compensation).filter(|v| *v >= COMPENSATION_MIN);
        if compensation.is_none() {
            errors.push(ValidationError::new("compensation", "Salary must be a valid number"));
        }

        let total_xp = parse_number(&self.total_xp).filter(|v| *v >= 0.0);
        if total_xp.is_none() {
            errors.push(ValidationError::new("total_xp", "Experience must be zero or more"));
        }

        let email = self.email.trim();
        if !is_valid_email(email) {
            errors.push(ValidationError::new("email", "Invalid email"));
        }

        let company_xp = if self.company_xp.trim().is_empty() {
            None
        } else {
            let parsed = parse_number(&self.company_xp).filter(|v| *v >= 0.0);
            if parsed.is_none() {
                errors.push(ValidationError::new("company_xp", "Experience must be zero or more"));
            }
            parsed
        };

        match (compensation, total_xp) {
            (Some(compensation), Some(total_xp)) if errors.is_empty() => Ok(ScoreInput {
                location: location.to_owned(),
                compensation,
                total_xp,
                email: email.to_owned(),
                company_xp,
                consent: self.consent.as_deref().map(checkbox_value),
            }),
            _ => Err(errors),
        }
    }
}

/// Raw admin login form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Destination carried through the login page.
    #[serde(default)]
    pub redirect: Option<String>,
}

impl LoginForm {
    /// # Errors
    ///
    /// Every failing field, in form order.
    pub fn validate(&self) -> Result<Credentials, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let email = self.email.trim();
        if !is_valid_email(email) {
            errors.push(ValidationError::new("email", "Invalid email"));
        }
        if self.password.is_empty() {
            errors.push(ValidationError::new("password", "Password is required"));
        }
        if errors.is_empty() { Ok(Credentials::new(email, self.password.clone())) } else { Err(errors) }
    }
}

/// Structural check: one `@`, a non-empty local part, a dotted domain with
/// no empty labels, no whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim().replace(',', ".");
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn checkbox_value(raw: &str) -> bool {
    !matches!(raw.trim().to_ascii_lowercase().as_str(), "false" | "off" | "0")
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;

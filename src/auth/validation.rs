// Form validation - checks that run locally before any network call
//
// Registration requires a reasonably strong password, a matching
// confirmation and accepted terms. Field mapping to the API schema also
// lives here so the REST layer only ever sees a valid payload.

use chrono::{NaiveDate, SecondsFormat};
use serde::Serialize;

/// Minimum password strength score accepted at registration
pub const MIN_PASSWORD_STRENGTH: u8 = 3;

/// Country sent when the user leaves the field blank
pub const DEFAULT_COUNTRY: &str = "PK";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please accept the terms to continue")]
    TermsNotAccepted,
    #[error("password is too weak (strength {strength}/5, need at least 3)")]
    WeakPassword { strength: u8 },
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("date of birth must be YYYY-MM-DD, got {0:?}")]
    InvalidDate(String),
}

/// Password strength score, 0..=5.
///
/// One point each for: at least 8 characters, an ASCII uppercase letter,
/// an ASCII lowercase letter, a digit, any other character.
pub fn password_strength(password: &str) -> u8 {
    let checks = [
        password.chars().count() >= 8,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    checks.iter().filter(|ok| **ok).count() as u8
}

/// Label shown next to the strength meter
pub fn strength_label(strength: u8) -> &'static str {
    match strength {
        0..=2 => "Weak",
        3 => "Medium",
        _ => "Strong",
    }
}

/// Registration form as typed by the user
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    /// `YYYY-MM-DD`, may be blank
    pub dob: String,
    /// URL, may be blank
    pub profile_picture: String,
    pub password: String,
    pub confirm_password: String,
    pub accept_terms: bool,
}

/// Body of `POST /api/v1/auth/register`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterPayload {
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    pub profile_picture: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn passwords_match(&self) -> bool {
        !self.confirm_password.is_empty() && self.password == self.confirm_password
    }

    /// Validate and map to the API schema
    pub fn validate(&self) -> Result<RegisterPayload, ValidationError> {
        if !self.accept_terms {
            return Err(ValidationError::TermsNotAccepted);
        }
        if !self.passwords_match() {
            return Err(ValidationError::PasswordMismatch);
        }
        let strength = password_strength(&self.password);
        if strength < MIN_PASSWORD_STRENGTH {
            return Err(ValidationError::WeakPassword { strength });
        }

        let full_name = required(&self.name, "full name")?;
        let email = required(&self.email, "email")?;
        let phone_number = required(&self.phone, "phone")?;

        let country = match self.country.trim() {
            "" => DEFAULT_COUNTRY.to_string(),
            c => c.to_string(),
        };

        let date_of_birth = match self.dob.trim() {
            "" => None,
            raw => Some(dob_to_timestamp(raw)?),
        };

        Ok(RegisterPayload {
            full_name,
            email,
            phone_number,
            country,
            date_of_birth,
            profile_picture: self.profile_picture.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    match value.trim() {
        "" => Err(ValidationError::MissingField(field)),
        v => Ok(v.to_string()),
    }
}

/// `YYYY-MM-DD` -> `YYYY-MM-DDT00:00:00.000Z`
fn dob_to_timestamp(raw: &str) -> Result<String, ValidationError> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ValidationError::InvalidDate(raw.to_string()))?
        .and_utc();
    Ok(midnight.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Login form; both fields are required before the request goes out
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        required(&self.email, "email")?;
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("password"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegistrationForm {
        RegistrationForm {
            name: "  Ada Lovelace ".to_string(),
            email: "ada@example.com ".to_string(),
            phone: "+920000000000".to_string(),
            country: String::new(),
            dob: "1990-12-10".to_string(),
            profile_picture: String::new(),
            password: "Passw0rd".to_string(),
            confirm_password: "Passw0rd".to_string(),
            accept_terms: true,
        }
    }

    #[test]
    fn test_password_strength_scoring() {
        assert_eq!(password_strength(""), 0);
        assert_eq!(password_strength("abc"), 1);
        assert_eq!(password_strength("abcdefgh"), 2);
        assert_eq!(password_strength("Abcdefgh"), 3);
        assert_eq!(password_strength("Abcdefg1"), 4);
        assert_eq!(password_strength("Abcdef1!"), 5);
    }

    #[test]
    fn test_valid_form_maps_to_payload() {
        let payload = valid_form().validate().unwrap();

        assert_eq!(payload.full_name, "Ada Lovelace");
        assert_eq!(payload.email, "ada@example.com");
        assert_eq!(payload.country, "PK");
        assert_eq!(
            payload.date_of_birth.as_deref(),
            Some("1990-12-10T00:00:00.000Z")
        );
        assert_eq!(payload.profile_picture, "");
    }

    #[test]
    fn test_terms_checked_before_password() {
        let mut form = valid_form();
        form.accept_terms = false;
        form.password = "weak".to_string();
        assert_eq!(form.validate(), Err(ValidationError::TermsNotAccepted));
    }

    #[test]
    fn test_mismatch_and_weak_passwords_rejected() {
        let mut form = valid_form();
        form.confirm_password = "Passw0rd!".to_string();
        assert_eq!(form.validate(), Err(ValidationError::PasswordMismatch));

        let mut form = valid_form();
        form.password = "password".to_string();
        form.confirm_password = "password".to_string();
        assert_eq!(
            form.validate(),
            Err(ValidationError::WeakPassword { strength: 2 })
        );
    }

    #[test]
    fn test_blank_dob_is_omitted_and_bad_dob_rejected() {
        let mut form = valid_form();
        form.dob = String::new();
        let json = serde_json::to_value(form.validate().unwrap()).unwrap();
        assert!(json.get("date_of_birth").is_none());

        let mut form = valid_form();
        form.dob = "10/12/1990".to_string();
        assert!(matches!(
            form.validate(),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let form = LoginForm {
            email: " ".to_string(),
            password: "x".to_string(),
        };
        assert_eq!(form.validate(), Err(ValidationError::MissingField("email")));
    }

    #[test]
    fn test_strength_labels() {
        assert_eq!(strength_label(0), "Weak");
        assert_eq!(strength_label(2), "Weak");
        assert_eq!(strength_label(3), "Medium");
        assert_eq!(strength_label(4), "Strong");
        assert_eq!(strength_label(password_strength("Abcdefg1!")), "Strong");
    }
}

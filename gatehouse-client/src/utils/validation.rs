//! Field validators shared by the `New*` payloads.

use std::borrow::Cow;
use validator::ValidationError;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "must not be blank"));
    }
    Ok(())
}

/// Digits with optional leading `+`, spaces and dashes; 9 to 15 digits.
pub fn phone_number(value: &str) -> Result<(), ValidationError> {
    let body = value.trim().strip_prefix('+').unwrap_or(value.trim());
    let allowed = body.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-');
    let digits = body.chars().filter(char::is_ascii_digit).count();

    if !allowed || !(9..=15).contains(&digits) {
        return Err(error("phone", "must be a phone number"));
    }
    Ok(())
}

/// Letters, digits, spaces and dashes, as printed on Thai and most other
/// plates.
pub fn license_plate(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    let chars = value.chars().count();
    let allowed = value
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-');

    if chars == 0 || chars > 16 || !allowed {
        return Err(error("license_plate", "must be a license plate"));
    }
    Ok(())
}

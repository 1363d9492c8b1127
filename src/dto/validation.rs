//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted display name, in characters, after trimming.
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

/// Validates that a display name holds 1 to [`MAX_DISPLAY_NAME_CHARS`] characters once trimmed.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Ada")   // Ok
/// validate_display_name("   ")   // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let length = name.trim().chars().count();

    if length == 0 {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Display name must not be blank".into());
        return Err(err);
    }

    if length > MAX_DISPLAY_NAME_CHARS {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(
            format!(
                "Display name must be at most {MAX_DISPLAY_NAME_CHARS} characters (got {length})"
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

//! Tag validation

use crate::error::{Error, Result};
use crate::status::Status;

/// Longest tag accepted, in bytes
pub const TAG_MAX: usize = 200;

/// Check a tag before it reaches storage.
///
/// Empty tags are rejected with `NullPointer`, oversize ones with
/// `TagTooLong`.
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(Error::with_message(Status::NullPointer, "Tag must not be empty"));
    }
    if tag.len() > TAG_MAX {
        return Err(Error::with_message(
            Status::TagTooLong,
            format!("Tag of {} bytes exceeds TAG_MAX ({})", tag.len(), TAG_MAX),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_boundary_length() {
        assert!(validate_tag("inbox").is_ok());
        assert!(validate_tag(&"a".repeat(TAG_MAX)).is_ok());
    }

    #[test]
    fn test_rejects_long_tag() {
        let err = validate_tag(&"a".repeat(TAG_MAX + 1)).unwrap_err();
        assert_eq!(err.status(), Status::TagTooLong);
    }

    #[test]
    fn test_length_is_measured_in_bytes() {
        // 101 two-byte characters
        let tag = "é".repeat(101);
        assert_eq!(validate_tag(&tag).unwrap_err().status(), Status::TagTooLong);
    }

    #[test]
    fn test_rejects_empty_tag() {
        assert_eq!(validate_tag("").unwrap_err().status(), Status::NullPointer);
    }
}

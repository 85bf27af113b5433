//! # Input Limits
//!
//! Hardcoded validation limits for the Stockroom catalog.
//!
//! These are compiled into the binary and immutable at runtime. They exist
//! to bound memory use from malformed or malicious input at the engine
//! boundary, before data reaches the record store.

/// Maximum length for category and instrument names.
pub const MAX_NAME_LENGTH: usize = 256;

/// Maximum length for description fields.
pub const MAX_DESCRIPTION_LENGTH: usize = 4096;

/// Maximum size of an instrument image attachment (2 MB).
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Maximum number of children attachable to a single main category.
///
/// The taxonomy is bounded to two levels; this bounds the width.
pub const MAX_CHILD_SET: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_sane() {
        assert!(MAX_NAME_LENGTH < MAX_DESCRIPTION_LENGTH);
        assert!(MAX_CHILD_SET >= 1);
    }
}

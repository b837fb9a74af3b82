//! Stable machine-readable codes for the crate's typed errors.

/// Maps an error variant to a stable `E_*` code hosts can match on.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

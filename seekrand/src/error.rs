use thiserror::Error;

/// Result type used by `seekrand`.
pub type RandResult<T> = Result<T, RandError>;

/// Errors reported to callers.
///
/// Broken internal invariants are not represented here, they trip debug assertions instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RandError {
    #[error("invalid range: start {start} + count {count} overflows")]
    InvalidRange { start: u64, count: u64 },

    #[error("range ends at element {end} but the sequence only has {max} elements")]
    OutOfRange { end: u64, max: u64 },

    #[error("destination holds {have} bytes, {need} are required")]
    BufferTooSmall { need: u64, have: u64 },

    #[error("default seed was already set or read")]
    DefaultSeedFrozen,
}

//! Domain constants and defaults

/// Default flow session duration when the caller omits one.
pub const DEFAULT_SESSION_MINUTES: u32 = 25;

/// Upper bound on a single flow session. Anything longer is a validation
/// error rather than a marathon.
pub const MAX_SESSION_MINUTES: u32 = 24 * 60;

/// Default focus block length for schedule optimization preferences.
pub const DEFAULT_FOCUS_BLOCK_MINUTES: u32 = 90;

/// Canonical date format used for boundary tagging (`YYYY-MM-DD`).
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Ordinal bucket used when an energy label is not recognized.
pub const ENERGY_FALLBACK_ORDINAL: u8 = 6;

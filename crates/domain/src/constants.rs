//! Domain constants
//!
//! Centralized location for domain-level constants used throughout the
//! application.

/// Characters stripped from a raw correlation response before it is stored
/// as a registry case identifier. The registry wraps identifiers in braces
/// and occasionally echoes surrounding quotes or whitespace.
pub const CORRELATION_DELIMITERS: &[char] =
    &['{', '}', '<', '>', '"', '\'', ';', ' ', '\t', '\r', '\n'];

/// Fixed timestamp format used by the registry's decision payloads
/// (fractional seconds, no zone designator).
pub const DECISION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// CSS marker class carried by the HTML element holding the decision
/// maker's name inside a decision `Content` fragment.
pub const DECISION_MAKER_MARKER_CLASS: &str = "decisionmaker-name";

/// Section symbol appended to the literal section-of-law field.
pub const SECTION_SYMBOL: &str = "\u{a7}";

/// Default timeout applied to every outbound registry call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Key under which the single active token row is stored.
pub const TOKEN_ROW_NAME: &str = "registry";

//! Application-wide constants
//!
//! This module contains all magic strings used throughout the crate,
//! providing a single source of truth for constant values.

/// Variant parameter defaults
pub mod variant {
    /// Default variant parameter for Array variance (also its index)
    pub const ARRAY_DEFAULT_PARAMETER: &str = "0";

    /// Default variant parameter for Dictionary variance
    pub const DICTIONARY_DEFAULT_PARAMETER: &str = "Default";
}

/// Option naming
pub mod naming {
    /// Prefix stripped from type identifiers when deriving option names
    pub const TYPE_PREFIX: &str = "Option";

    /// Separator between module path segments in a type identifier
    pub const MODULE_SEPARATOR: &str = "::";
}

/// Machine-addressable path grammar
pub mod path {
    /// Separates a segment from the next (`Name/Child`)
    pub const SEGMENT_SEPARATOR: char = '/';

    /// Separates a segment name from its variant parameter (`Name:Parameter`)
    pub const PARAMETER_SEPARATOR: char = ':';
}

/// Human-editable text format
pub mod text {
    /// Line prefixes that mark a comment (after trimming)
    pub const COMMENT_PREFIXES: &[&str] = &["#", "//", ";"];

    pub const CHILD_SEPARATOR: char = '.';
    pub const PARAMETER_OPEN: char = '[';
    pub const PARAMETER_CLOSE: char = ']';
    pub const ASSIGNMENT: char = '=';
    pub const QUOTE: char = '"';
    pub const ESCAPE: char = '\\';
}

/// Configuration file location
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "option-profile";

    /// Default document file name
    pub const FILENAME: &str = "profile.ini";

    /// Environment variable overriding the document path
    pub const FILE_ENV: &str = "OPTION_PROFILE_FILE";

    /// Environment variable selecting the log level
    pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

    /// Extension selecting the flattened JSON form
    pub const JSON_EXTENSION: &str = "json";
}

use std::fmt;

/// Errors surfaced by element definition, loading and registration.
///
/// Failures that the element layer absorbs (unresolvable event handlers,
/// missing repeat containers, malformed attribute JSON) are logged instead
/// and never reach this type.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementError {
    /// Transport-level failure while fetching a component file.
    Fetch { url: String, reason: String },
    /// The component file was fetched but the response was not a success.
    Status { url: String, status: u16, reason: String },
    /// Markup could not be parsed or serialized.
    Parse { reason: String },
    /// A `<script>` descriptor could not be statically evaluated.
    Script { reason: String },
    /// The tag name is already defined in the host document.
    AlreadyDefined { tag: String },
    /// The tag name is not a valid custom element name.
    InvalidTagName { tag: String },
    /// Configuration could not be read or deserialized.
    Config { reason: String },
    Io { path: String, reason: String },
}

impl ElementError {
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    pub fn script(reason: impl Into<String>) -> Self {
        Self::Script {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch { url, reason } => {
                write!(f, "Failed to load component from {}: {}", url, reason)
            }
            Self::Status {
                url,
                status,
                reason,
            } => write!(
                f,
                "Failed to load component from {}: {} {}",
                url, status, reason
            ),
            Self::Parse { reason } => write!(f, "Failed to parse markup: {}", reason),
            Self::Script { reason } => write!(f, "Error parsing script: {}", reason),
            Self::AlreadyDefined { tag } => {
                write!(f, "Element '{}' has already been defined", tag)
            }
            Self::InvalidTagName { tag } => {
                write!(f, "'{}' is not a valid custom element name", tag)
            }
            Self::Config { reason } => write!(f, "Invalid configuration: {}", reason),
            Self::Io { path, reason } => write!(f, "I/O error on {}: {}", path, reason),
        }
    }
}

impl std::error::Error for ElementError {}

pub type Result<T> = std::result::Result<T, ElementError>;

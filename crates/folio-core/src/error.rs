use std::fmt;

/// Machine-readable error codes for scripted consumers of folio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AdapterUnavailable,
    AdapterConnectFailed,
    UnrecognizedPayload,
    ConfigParseError,
    ProjectNotFound,
    InvalidSortKey,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AdapterUnavailable => "E1001",
            Self::AdapterConnectFailed => "E1002",
            Self::UnrecognizedPayload => "E2001",
            Self::ConfigParseError => "E3001",
            Self::ProjectNotFound => "E4001",
            Self::InvalidSortKey => "E4002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::AdapterUnavailable => "Data provider not available",
            Self::AdapterConnectFailed => "Data provider handshake failed",
            Self::UnrecognizedPayload => "Payload has no recognizable record shape",
            Self::ConfigParseError => "Config file parse error",
            Self::ProjectNotFound => "Project not found",
            Self::InvalidSortKey => "Invalid sort key",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::AdapterUnavailable => {
                Some("Pass `--source <file>` or set `[source] path` in .folio/config.toml.")
            }
            Self::AdapterConnectFailed => Some("Check that the source file exists and is readable."),
            Self::UnrecognizedPayload => Some(
                "Provide a JSON array of rows, an object with `records`/`data`, or a columnar table.",
            ),
            Self::ConfigParseError => Some("Fix syntax in .folio/config.toml and retry."),
            Self::ProjectNotFound => Some("Run `folio list` to see available project numbers."),
            Self::InvalidSortKey => Some(
                "Use one of project_number, name, client, category, year, country, deliverables.",
            ),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Reasons a raw payload could not be decoded into rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    /// No columnar, array, wrapped, or scanned shape matched.
    #[error("could not locate records in payload ({found})")]
    UnrecognizedShape {
        /// JSON type of the payload that was rejected.
        found: &'static str,
    },

    /// The payload file was not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Errors surfaced by the folio core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FolioError {
    /// No data provider is attached.
    #[error("data provider not available")]
    AdapterUnavailable,

    /// The provider exists but its handshake or fetch failed.
    #[error("data provider handshake failed: {0}")]
    AdapterConnect(String),

    /// The provider answered with a payload we cannot decode.
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    /// A config file could not be read or parsed.
    #[error("config error: {0}")]
    ConfigParse(String),

    /// No project carries the requested identity.
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// A sort key string did not name a sortable attribute.
    #[error("unknown sort key '{0}'")]
    InvalidSortKey(String),
}

impl FolioError {
    /// The stable code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::AdapterUnavailable => ErrorCode::AdapterUnavailable,
            Self::AdapterConnect(_) => ErrorCode::AdapterConnectFailed,
            Self::Normalization(_) => ErrorCode::UnrecognizedPayload,
            Self::ConfigParse(_) => ErrorCode::ConfigParseError,
            Self::ProjectNotFound(_) => ErrorCode::ProjectNotFound,
            Self::InvalidSortKey(_) => ErrorCode::InvalidSortKey,
        }
    }

    /// Remediation text for terminal and JSON error output.
    #[must_use]
    pub fn suggestion(&self) -> String {
        self.error_code()
            .hint()
            .unwrap_or_else(|| self.error_code().message())
            .to_string()
    }

    /// Whether a load that failed with this error should fall back to the
    /// built-in sample dataset.
    #[must_use]
    pub const fn is_recoverable_load_failure(&self) -> bool {
        matches!(
            self,
            Self::AdapterUnavailable | Self::AdapterConnect(_) | Self::Normalization(_)
        )
    }
}

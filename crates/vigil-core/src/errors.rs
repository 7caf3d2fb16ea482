use thiserror::Error;

/// Result type alias using the canonical VgError
pub type Result<T> = std::result::Result<T, VgError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every error that crosses a crate boundary is classified by one of these
/// kinds. Each kind maps to a stable code for log assertions and process
/// diagnostics, and knows whether it is fatal to the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VgErrorKind {
    // Startup
    /// Configuration file missing, unparsable or invalid
    Config,
    /// Every configured adapter is disabled or failed registration
    NoUsableAdapters,

    // Snapshot
    /// The snapshot document could not be read or parsed
    SnapshotLoad,
    /// The snapshot parsed but violates a structural contract (duplicate ids)
    InvalidSnapshot,
    /// The snapshot declares a format version this build does not understand
    UnsupportedFormat,

    // Adapters
    AdapterConnection,
    AdapterDelivery,
    Timeout,
    /// A command from someone the adapter's gate does not admit
    Unauthorised,

    // Integration/IO
    Io,
}

impl VgErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            VgErrorKind::Config => "ERR_CONFIG",
            VgErrorKind::NoUsableAdapters => "ERR_NO_USABLE_ADAPTERS",
            VgErrorKind::SnapshotLoad => "ERR_SNAPSHOT_LOAD",
            VgErrorKind::InvalidSnapshot => "ERR_INVALID_SNAPSHOT",
            VgErrorKind::UnsupportedFormat => "ERR_UNSUPPORTED_FORMAT",
            VgErrorKind::AdapterConnection => "ERR_ADAPTER_CONNECTION",
            VgErrorKind::AdapterDelivery => "ERR_ADAPTER_DELIVERY",
            VgErrorKind::Timeout => "ERR_TIMEOUT",
            VgErrorKind::Unauthorised => "ERR_UNAUTHORISED",
            VgErrorKind::Io => "ERR_IO",
        }
    }

    /// Whether an error of this kind must terminate the process.
    ///
    /// Only startup-time configuration and registration failures are fatal;
    /// everything raised while the monitoring loop runs is logged and the
    /// loop carries on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VgErrorKind::Config | VgErrorKind::NoUsableAdapters)
    }
}

/// Canonical structured error type
#[derive(Debug, Clone)]
pub struct VgError {
    kind: VgErrorKind,
    op: Option<String>,
    facility_id: Option<String>,
    instance_id: Option<String>,
    adapter: Option<String>,
    path: Option<String>,
    message: String,
}

impl VgError {
    /// Create a new error with the specified kind
    pub fn new(kind: VgErrorKind) -> Self {
        Self {
            kind,
            op: None,
            facility_id: None,
            instance_id: None,
            adapter: None,
            path: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add facility ID context
    pub fn with_facility_id(mut self, id: impl Into<String>) -> Self {
        self.facility_id = Some(id.into());
        self
    }

    /// Add instance ID context
    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = Some(id.into());
        self
    }

    /// Add adapter name context
    pub fn with_adapter(mut self, name: impl Into<String>) -> Self {
        self.adapter = Some(name.into());
        self
    }

    /// Add file path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> VgErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn facility_id(&self) -> Option<&str> {
        self.facility_id.as_deref()
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub fn adapter(&self) -> Option<&str> {
        self.adapter.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for VgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(adapter) = &self.adapter {
            write!(f, " (adapter: {})", adapter)?;
        }
        if let Some(facility_id) = &self.facility_id {
            write!(f, " (facility_id: {})", facility_id)?;
        }
        if let Some(instance_id) = &self.instance_id {
            write!(f, " (instance_id: {})", instance_id)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for VgError {}

// ========== End Error Facility ==========

/// Structural problems found while building or validating a snapshot
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// The document has no facilities at all
    #[error("Snapshot lists no facilities")]
    NoFacilities,

    /// Two facilities share one id
    #[error("Duplicate facility id: {facility_id}")]
    DuplicateFacility { facility_id: String },

    /// Two instances of one facility share one id
    #[error("Duplicate instance id {instance_id} in facility {facility_id}")]
    DuplicateInstance {
        facility_id: String,
        instance_id: String,
    },

    /// A facility or instance has an empty id
    #[error("Empty id in {context}")]
    EmptyId { context: String },

    /// A status code outside the known set
    #[error("Invalid status code {code} in {context}")]
    InvalidStatusCode { code: i64, context: String },

    /// The document declares a format version this build does not read
    #[error("Unsupported snapshot format version {version} (expected {expected})")]
    UnsupportedFormat { version: u64, expected: u64 },

    /// The document is not shaped like a snapshot
    #[error("Malformed snapshot document: {message}")]
    Malformed { message: String },
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Malformed {
            message: err.to_string(),
        }
    }
}

/// Conversion from SnapshotError to VgError
impl From<SnapshotError> for VgError {
    fn from(err: SnapshotError) -> Self {
        let message = err.to_string();
        match err {
            SnapshotError::DuplicateFacility { facility_id } => {
                VgError::new(VgErrorKind::InvalidSnapshot)
                    .with_facility_id(facility_id)
                    .with_message(message)
            }
            SnapshotError::DuplicateInstance {
                facility_id,
                instance_id,
            } => VgError::new(VgErrorKind::InvalidSnapshot)
                .with_facility_id(facility_id)
                .with_instance_id(instance_id)
                .with_message(message),
            SnapshotError::NoFacilities | SnapshotError::EmptyId { .. } => {
                VgError::new(VgErrorKind::InvalidSnapshot).with_message(message)
            }
            SnapshotError::UnsupportedFormat { .. } => {
                VgError::new(VgErrorKind::UnsupportedFormat).with_message(message)
            }
            SnapshotError::InvalidStatusCode { .. } | SnapshotError::Malformed { .. } => {
                VgError::new(VgErrorKind::SnapshotLoad).with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (VgErrorKind::Config, "ERR_CONFIG"),
            (VgErrorKind::NoUsableAdapters, "ERR_NO_USABLE_ADAPTERS"),
            (VgErrorKind::SnapshotLoad, "ERR_SNAPSHOT_LOAD"),
            (VgErrorKind::InvalidSnapshot, "ERR_INVALID_SNAPSHOT"),
            (VgErrorKind::AdapterConnection, "ERR_ADAPTER_CONNECTION"),
            (VgErrorKind::AdapterDelivery, "ERR_ADAPTER_DELIVERY"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_only_startup_kinds_are_fatal() {
        assert!(VgErrorKind::Config.is_fatal());
        assert!(VgErrorKind::NoUsableAdapters.is_fatal());
        for kind in [
            VgErrorKind::SnapshotLoad,
            VgErrorKind::InvalidSnapshot,
            VgErrorKind::UnsupportedFormat,
            VgErrorKind::AdapterConnection,
            VgErrorKind::AdapterDelivery,
            VgErrorKind::Timeout,
            VgErrorKind::Unauthorised,
        ] {
            assert!(!kind.is_fatal(), "{:?} must not be fatal", kind);
        }
    }

    #[test]
    fn test_duplicate_facility_maps_to_invalid_snapshot() {
        let err: VgError = SnapshotError::DuplicateFacility {
            facility_id: "web".to_string(),
        }
        .into();
        assert_eq!(err.kind(), VgErrorKind::InvalidSnapshot);
        assert_eq!(err.facility_id(), Some("web"));
    }

    #[test]
    fn test_display_includes_context() {
        let err = VgError::new(VgErrorKind::AdapterDelivery)
            .with_op("deliver")
            .with_adapter("libera")
            .with_message("connection reset");
        let text = err.to_string();
        assert!(text.starts_with("[ERR_ADAPTER_DELIVERY]"));
        assert!(text.contains("deliver"));
        assert!(text.contains("libera"));
        assert!(text.contains("connection reset"));
    }
}

use thiserror::Error;

/// Errors that can occur while resolving the upstream endpoint of a pod
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The port-name annotation names a port that no container declares
    #[error("no port with name {0} found")]
    PortNotFound(String),

    /// The port-name annotation matches more than one declared port
    #[error("there is more than one port with name {0}")]
    AmbiguousPort(String),

    /// No port-name annotation and the pod does not declare exactly one port
    #[error(
        "port name must be passed via annotation unless there is exactly one port, found {found}"
    )]
    PortSelectionRequiresAnnotation { found: usize },

    /// Every valid port number is already declared on the pod
    #[error("no unused container port left for the sidecar to listen on")]
    NoFreePort,
}

/// Errors that can occur while turning patch operations into an RFC 6902 document
#[derive(Error, Debug)]
pub enum PatchError {
    /// A generated path is not a valid JSON pointer
    #[error("invalid patch path {path}: {reason}")]
    Path { path: String, reason: String },

    /// A container or volume could not be converted to JSON
    #[error("failed to serialize patch value: {0}")]
    Value(#[from] serde_json::Error),
}

/// Errors that can occur while answering a single admission request
///
/// None of these are fatal: the boundary answers every one of them with an
/// allowed, unmutated response carrying the error text as a warning.
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// The request targets a resource other than core/v1 pods
    #[error("expected resource to be {expected}, got {actual}")]
    ResourceMismatch { expected: String, actual: String },

    /// The request carries no object to inspect
    #[error("admission request has no object")]
    MissingObject,

    /// The object could not be decoded into a Pod
    #[error("failed to deserialize pod: {0}")]
    Decode(#[source] serde_json::Error),

    /// The upstream port could not be resolved
    #[error("failed to resolve upstream port: {0}")]
    Resolution(#[from] ResolutionError),

    /// The patch could not be built into a JSON Patch document
    #[error("failed to build patch: {0}")]
    Patch(#[from] PatchError),

    /// The patch could not be embedded into the response envelope
    #[error("failed to marshal patch: {0}")]
    Serialization(String),
}

/// Result type for admission operations
pub type Result<T, E = AdmissionError> = std::result::Result<T, E>;

/// Error types for the Stellar client
use prost::Message;
use stellar_proto::ErrorDetails;
use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Document exists: {0}")]
    DocumentExists(String),

    #[error("Document locked: {0}")]
    DocumentLocked(String),

    #[error("CAS mismatch: {0}")]
    CasMismatch(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Path exists: {0}")]
    PathExists(String),

    #[error("Path mismatch: {0}")]
    PathMismatch(String),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Bucket exists: {0}")]
    BucketExists(String),

    #[error("Query has already been executed")]
    AlreadyQueried,

    #[error("Value format error: {0}")]
    ValueFormat(String),

    #[error("Condition check failed: {0}")]
    FailedPrecondition(String),

    #[error("Operation aborted: {0}")]
    Aborted(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Server unavailable: {0}")]
    Unavailable(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ClientError {
    /// Returns a stable error code for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ClientError::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            ClientError::DocumentExists(_) => "DOCUMENT_EXISTS",
            ClientError::DocumentLocked(_) => "DOCUMENT_LOCKED",
            ClientError::CasMismatch(_) => "CAS_MISMATCH",
            ClientError::PathNotFound(_) => "PATH_NOT_FOUND",
            ClientError::PathExists(_) => "PATH_EXISTS",
            ClientError::PathMismatch(_) => "PATH_MISMATCH",
            ClientError::BucketNotFound(_) => "BUCKET_NOT_FOUND",
            ClientError::BucketExists(_) => "BUCKET_EXISTS",
            ClientError::AlreadyQueried => "ALREADY_QUERIED",
            ClientError::ValueFormat(_) => "VALUE_FORMAT",
            ClientError::FailedPrecondition(_) => "FAILED_PRECONDITION",
            ClientError::Aborted(_) => "ABORTED",
            ClientError::ConnectionError(_) => "CONNECTION_ERROR",
            ClientError::Unavailable(_) => "UNAVAILABLE",
            ClientError::Timeout(_) => "TIMEOUT",
            ClientError::Cancelled(_) => "CANCELLED",
            ClientError::InternalError(_) => "INTERNAL_ERROR",
            ClientError::ResourceExhausted(_) => "RESOURCE_EXHAUSTED",
            ClientError::Unimplemented(_) => "UNIMPLEMENTED",
            ClientError::PermissionDenied(_) => "PERMISSION_DENIED",
            ClientError::Unknown(_) => "UNKNOWN",
        }
    }

    /// Returns true if a caller-level retry loop may reasonably try again.
    ///
    /// The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::DocumentLocked(_) => true,
            ClientError::Unavailable(_) => true,
            ClientError::ResourceExhausted(_) => true,
            ClientError::Timeout(_) => true,

            ClientError::InvalidArgument(_)
            | ClientError::DocumentNotFound(_)
            | ClientError::DocumentExists(_)
            | ClientError::CasMismatch(_)
            | ClientError::PathNotFound(_)
            | ClientError::PathExists(_)
            | ClientError::PathMismatch(_)
            | ClientError::BucketNotFound(_)
            | ClientError::BucketExists(_)
            | ClientError::AlreadyQueried
            | ClientError::ValueFormat(_)
            | ClientError::FailedPrecondition(_)
            | ClientError::Aborted(_)
            | ClientError::ConnectionError(_)
            | ClientError::Cancelled(_)
            | ClientError::InternalError(_)
            | ClientError::Unimplemented(_)
            | ClientError::PermissionDenied(_)
            | ClientError::Unknown(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Convert gRPC Status to ClientError
///
/// Semantic failures are qualified by the `ErrorDetails` message the
/// service places in the status details; without it the status code alone
/// decides.
impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        let details = ErrorDetails::decode(status.details()).unwrap_or_default();
        let msg = if details.resource_name.is_empty() {
            status.message().to_string()
        } else {
            format!("{} ({})", status.message(), details.resource_name)
        };

        match status.code() {
            tonic::Code::NotFound => match details.resource_type.as_str() {
                "path" => ClientError::PathNotFound(msg),
                "bucket" => ClientError::BucketNotFound(msg),
                _ => ClientError::DocumentNotFound(msg),
            },
            tonic::Code::AlreadyExists => match details.resource_type.as_str() {
                "path" => ClientError::PathExists(msg),
                "bucket" => ClientError::BucketExists(msg),
                _ => ClientError::DocumentExists(msg),
            },
            tonic::Code::Aborted => match details.reason.as_str() {
                "CAS_MISMATCH" => ClientError::CasMismatch(msg),
                _ => ClientError::Aborted(msg),
            },
            tonic::Code::FailedPrecondition => match details.reason.as_str() {
                "CAS_MISMATCH" => ClientError::CasMismatch(msg),
                "LOCKED" => ClientError::DocumentLocked(msg),
                "PATH_MISMATCH" => ClientError::PathMismatch(msg),
                _ => ClientError::FailedPrecondition(msg),
            },
            tonic::Code::InvalidArgument => ClientError::InvalidArgument(msg),
            tonic::Code::Unavailable => ClientError::Unavailable(msg),
            tonic::Code::DeadlineExceeded => ClientError::Timeout(msg),
            tonic::Code::Cancelled => ClientError::Cancelled(msg),
            tonic::Code::Internal | tonic::Code::DataLoss => ClientError::InternalError(msg),
            tonic::Code::ResourceExhausted => ClientError::ResourceExhausted(msg),
            tonic::Code::Unimplemented => ClientError::Unimplemented(msg),
            tonic::Code::PermissionDenied | tonic::Code::Unauthenticated => {
                ClientError::PermissionDenied(msg)
            }
            _ => ClientError::Unknown(msg),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::ValueFormat(err.to_string())
    }
}

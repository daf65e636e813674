use crate::access::AccessError;
use crate::store::StoreError;
use http::StatusCode;
use thiserror::Error;

/// Result type alias for global DNS action handling
pub type Result<T, E = GlobalDnsError> = std::result::Result<T, E>;

/// Errors that can occur while handling a target-project action
#[derive(Error, Debug)]
pub enum GlobalDnsError {
    #[error("incorrect global DNS ID")]
    MalformedId,

    #[error("GlobalDNS {0} has no creatorId annotation")]
    MissingCreatorAnnotation(String),

    #[error("only owners can modify global DNS target projects")]
    NotOwner,

    #[error("cannot add projects to globaldns as targets if multiclusterappID is set {0}")]
    MultiClusterAppBound(String),

    #[error("user {user} does not have access to project {project_id}")]
    UnauthorizedTarget { user: String, project_id: String },

    #[error("bad action for global dns {0}")]
    BadAction(String),

    /// Retry budget spent on conflicts; carries the last conflict.
    #[error("timed out updating target projects of global DNS {id}")]
    UpdateTimedOut {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("response serialization error: {0}")]
    ResponseSerialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("hyper error: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("http error: {0}")]
    Http(#[from] http::Error),
}

impl From<std::convert::Infallible> for GlobalDnsError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl GlobalDnsError {
    /// HTTP status for the API error envelope.
    pub fn status(&self) -> StatusCode {
        match self {
            GlobalDnsError::MalformedId
            | GlobalDnsError::MultiClusterAppBound(_)
            | GlobalDnsError::BadAction(_)
            | GlobalDnsError::RequestBody(_) => StatusCode::BAD_REQUEST,
            GlobalDnsError::NotOwner
            | GlobalDnsError::UnauthorizedTarget { .. }
            | GlobalDnsError::Store(StoreError::Forbidden(_)) => StatusCode::FORBIDDEN,
            GlobalDnsError::UpdateTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            GlobalDnsError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            GlobalDnsError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            GlobalDnsError::MissingCreatorAnnotation(_)
            | GlobalDnsError::Store(StoreError::Unavailable(_))
            | GlobalDnsError::Access(_)
            | GlobalDnsError::ResponseSerialization(_)
            | GlobalDnsError::Io(_)
            | GlobalDnsError::Hyper(_)
            | GlobalDnsError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Code string for the API error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            GlobalDnsError::MalformedId => "InvalidFormat",
            GlobalDnsError::MultiClusterAppBound(_) => "InvalidOption",
            GlobalDnsError::BadAction(_) => "InvalidAction",
            GlobalDnsError::RequestBody(_) => "InvalidBodyContent",
            GlobalDnsError::NotOwner
            | GlobalDnsError::UnauthorizedTarget { .. }
            | GlobalDnsError::Store(StoreError::Forbidden(_)) => "Forbidden",
            GlobalDnsError::UpdateTimedOut { .. } => "Timeout",
            GlobalDnsError::Store(StoreError::NotFound(_)) => "NotFound",
            GlobalDnsError::Store(StoreError::Conflict(_)) => "Conflict",
            _ => "ServerError",
        }
    }
}

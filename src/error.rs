//! Error types for token acquisition and authenticated sends.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Token-acquisition failure raised before an outbound request is sent.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary identity-provider failure.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS) while calling the token endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Requested scopes exceed what the client may obtain.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider rejected the grant.
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token record builder validation failed.
	#[error("Unable to build token record.")]
	TokenBuild(#[from] crate::auth::TokenRecordBuilderError),
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Provider changed scopes during the exchange.
	#[error("Token endpoint changed the granted scopes.")]
	ScopesChanged,
	/// A value cannot be carried in an HTTP header.
	#[error("Value for the `{header}` header is not a valid HTTP header value.")]
	InvalidHeaderValue {
		/// Header the value was destined for.
		header: String,
	},
	/// A configured header name is not a valid HTTP header name.
	#[error("`{name}` is not a valid HTTP header name.")]
	InvalidHeaderName {
		/// Offending name.
		name: String,
	},
	/// Client secret was empty.
	#[error("Client secret cannot be empty.")]
	EmptyClientSecret,
	/// A service-credential client was requested without a credentials section.
	#[error("Service credentials are not configured.")]
	MissingCredentials,
	/// Configuration document could not be deserialized.
	#[error("Configuration is malformed at `{}`.", source.path())]
	Parse {
		/// Structured parsing failure, including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	pub(crate) fn invalid_header_value(header: impl Display) -> Self {
		Self::InvalidHeaderValue { header: header.to_string() }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Outcome of an authenticated send that did not yield a downstream response.
///
/// A token failure means the downstream request was never sent. A downstream failure is the
/// unmodified transport error from the send path. Downstream HTTP error statuses are not
/// errors; they arrive as `Ok(Response)`.
#[derive(Debug, ThisError)]
pub enum SendError {
	/// Authorization could not be established; nothing was sent downstream.
	#[error("Outbound request was not sent because authorization failed.")]
	Token(#[source] Error),
	/// The downstream call itself failed.
	#[error("Downstream request failed.")]
	Downstream(#[source] ReqwestError),
	/// The path could not be resolved beneath the downstream base URL.
	#[error("Path `{path}` cannot be resolved against the downstream base URL.")]
	InvalidPath {
		/// Path supplied by the caller.
		path: String,
		/// Why the path was refused.
		#[source]
		source: PathError,
	},
}

/// Reasons [`Downstream::resolve`](crate::outbound::Downstream::resolve) refuses a path.
#[derive(Debug, ThisError)]
pub enum PathError {
	/// The path is not a valid URL reference.
	#[error(transparent)]
	Malformed(#[from] url::ParseError),
	/// The resolved URL points at another origin or above the base path.
	#[error("Resolved URL `{resolved}` leaves the downstream base URL.")]
	OutsideBase {
		/// URL the path resolved to.
		resolved: Url,
	},
}
impl SendError {
	/// Returns `true` when the request never left the process because authorization failed.
	pub fn is_token_failure(&self) -> bool {
		matches!(self, Self::Token(_))
	}

	/// Returns the token-acquisition error, if this is one.
	pub fn as_token_error(&self) -> Option<&Error> {
		match self {
			Self::Token(e) => Some(e),
			_ => None,
		}
	}
}

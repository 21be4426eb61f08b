//! Client-credentials exchange built on the `oauth2` crate.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenRecord, TokenRecordBuilderError},
	error::{ConfigError, TransientError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
	outbound::ServiceCredentials,
	provider::{ClientAuthMethod, ProviderErrorContext, ProviderErrorKind, ProviderStrategy},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Token endpoint facade bound to one set of service credentials.
pub(crate) struct ClientCredentialsFacade {
	oauth_client: ConfiguredBasicClient,
	http_client: ReqwestHttpClient,
}
impl ClientCredentialsFacade {
	pub(crate) fn new(
		credentials: &ServiceCredentials,
		http_client: ReqwestHttpClient,
	) -> Result<Self> {
		let descriptor = &credentials.descriptor;
		let token_url = TokenUrl::new(descriptor.token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let client_id = OAuthClientId::new(credentials.client_id.to_string());
		let client_secret = ClientSecret::new(credentials.client_secret.expose().to_owned());
		let mut oauth_client = BasicClient::new(client_id)
			.set_token_uri(token_url)
			.set_client_secret(client_secret);

		if matches!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self { oauth_client, http_client })
	}

	/// Performs one `grant_type=client_credentials` exchange.
	pub(crate) async fn exchange(
		&self,
		credentials: &ServiceCredentials,
		strategy: &dyn ProviderStrategy,
	) -> Result<TokenRecord> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.instrumented(meta.clone());
		let mut request = self.oauth_client.exchange_client_credentials();
		let scope = &credentials.scope;
		let delimiter = credentials.descriptor.scope_delimiter;

		if delimiter == ' ' {
			for value in scope.iter() {
				request = request.add_scope(Scope::new(value.to_owned()));
			}
		} else if let Some(joined) = scope.join(delimiter) {
			request = request.add_extra_param("scope", joined);
		}

		let mut extra = BTreeMap::new();

		strategy.augment_token_request(&mut extra);

		for (key, value) in extra {
			if key != "grant_type" && key != "scope" {
				request = request.add_extra_param(key, value);
			}
		}

		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(strategy, meta.take(), err))?;

		map_token_response(credentials, response)
	}
}

fn map_token_response(
	credentials: &ServiceCredentials,
	response: BasicTokenResponse,
) -> Result<TokenRecord> {
	// A missing or zero `expires_in` yields a record that is never reused from cache.
	let lifetime = match response.expires_in() {
		Some(value) =>
			i64::try_from(value.as_secs()).map_err(|_| ConfigError::ExpiresInOutOfRange)?,
		None => 0,
	};

	if let Some(scopes) = response.scopes().filter(|_| !credentials.scope.is_empty()) {
		let granted = granted_scopes(scopes, credentials.descriptor.scope_delimiter)?;

		if !credentials.scope.iter().all(|scope| granted.contains(scope)) {
			return Err(ConfigError::ScopesChanged.into());
		}
	}

	// Records are keyed by the requested scope so cached lookups find them again.
	TokenRecord::builder(
		credentials.descriptor.id.clone(),
		credentials.client_id.clone(),
		credentials.scope.clone(),
	)
	.access_token(response.access_token().secret().to_owned())
	.issued_at(OffsetDateTime::now_utc())
	.expires_in(Duration::seconds(lifetime))
	.build()
	.map_err(|err| match err {
		TokenRecordBuilderError::ExpiryOutOfRange => ConfigError::ExpiresInOutOfRange.into(),
		err => ConfigError::from(err).into(),
	})
}

// The response parser always splits on spaces, so providers that echo a custom delimiter
// arrive as one joined entry.
fn granted_scopes(scopes: &[Scope], delimiter: char) -> Result<ScopeSet> {
	let values = scopes
		.iter()
		.flat_map(|scope| scope.as_str().split(delimiter))
		.filter(|value| !value.is_empty());

	ScopeSet::new(values).map_err(|err| ConfigError::from(err).into())
}

fn map_request_error(
	strategy: &dyn ProviderStrategy,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let meta = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(strategy, response, meta),
		RequestTokenError::Request(error) => map_transport_error(meta, error),
		RequestTokenError::Parse(source, body) => map_unparsed_body(strategy, meta, source, &body),
		RequestTokenError::Other(message) => transient(message, meta),
	}
}

fn map_server_response_error(
	strategy: &dyn ProviderStrategy,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let code = response.error().as_ref().to_string();
	let mut ctx = ProviderErrorContext::new().with_oauth_error(code.clone());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	let reason = match response.error_description() {
		Some(description) => format!("{code}: {description}"),
		None => code,
	};

	classified(strategy.classify_token_error(&ctx), reason, meta)
}

// Error statuses with a body that is not an OAuth error document are classified from the
// status and a body preview. A success status with an unreadable body stays a parse failure.
fn map_unparsed_body(
	strategy: &dyn ProviderStrategy,
	meta: Option<&ResponseMetadata>,
	source: serde_path_to_error::Error<serde_json::Error>,
	body: &[u8],
) -> Error {
	let status = meta_status(meta);
	let Some(error_status) = status.filter(|code| *code >= 400) else {
		return TransientError::TokenResponseParse { source, status }.into();
	};
	let ctx = ProviderErrorContext::new()
		.with_http_status(error_status)
		.with_body_preview(String::from_utf8_lossy(body));
	let kind = strategy.classify_token_error(&ctx);
	let reason = ctx.body_preview.unwrap_or_default();

	classified(kind, format!("HTTP {error_status}: {reason}"), meta)
}

fn classified(kind: ProviderErrorKind, reason: String, meta: Option<&ResponseMetadata>) -> Error {
	match kind {
		ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason },
		ProviderErrorKind::InvalidClient => Error::InvalidClient { reason },
		ProviderErrorKind::InsufficientScope => Error::InsufficientScope { reason },
		ProviderErrorKind::Transient => transient(reason, meta),
	}
}

fn map_transport_error(
	meta: Option<&ResponseMetadata>,
	err: HttpClientError<ReqwestError>,
) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => {
			let inner = *inner;

			if inner.is_builder() {
				ConfigError::from(inner).into()
			} else if inner.is_timeout() {
				transient("request to the token endpoint timed out", meta)
			} else {
				TransportError::from(inner).into()
			}
		},
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => transient(message, meta),
		_ => transient("unrecognized HTTP client failure", meta),
	}
}

fn transient(message: impl Into<String>, meta: Option<&ResponseMetadata>) -> Error {
	TransientError::TokenEndpoint {
		message: message.into(),
		status: meta_status(meta),
		retry_after: meta.and_then(|value| value.retry_after),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::test_descriptor,
		auth::ClientId,
		provider::{DefaultProviderStrategy, ProviderDescriptor},
	};

	fn credentials(descriptor: ProviderDescriptor) -> ServiceCredentials {
		ServiceCredentials::new(
			descriptor,
			ClientId::new("dispatch-api").expect("Client fixture should be valid."),
			"secret",
		)
	}

	#[test]
	fn builds_facade_for_both_auth_methods() {
		let post = test_descriptor("https://idp.example.com/connect/token");
		let basic = ProviderDescriptor {
			client_auth_method: ClientAuthMethod::ClientSecretBasic,
			..post.clone()
		};

		assert!(ClientCredentialsFacade::new(&credentials(post), Default::default()).is_ok());
		assert!(ClientCredentialsFacade::new(&credentials(basic), Default::default()).is_ok());
	}

	#[test]
	fn server_errors_are_classified_by_strategy() {
		let response: BasicErrorResponse =
			serde_json::from_str("{\"error\":\"invalid_client\",\"error_description\":\"nope\"}")
				.expect("Error response fixture should deserialize.");
		let meta = ResponseMetadata { status: Some(401), retry_after: None };
		let err = map_server_response_error(&DefaultProviderStrategy, response, Some(&meta));

		match err {
			Error::InvalidClient { reason } => assert_eq!(reason, "invalid_client: nope"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn other_failures_keep_metadata() {
		let meta =
			ResponseMetadata { status: Some(503), retry_after: Some(Duration::seconds(12)) };
		let err = transient("empty body", Some(&meta));

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenEndpoint {
				status: Some(503),
				retry_after: Some(retry),
				..
			}) if retry == Duration::seconds(12)
		));
	}

	fn parse_failure(body: &[u8]) -> serde_path_to_error::Error<serde_json::Error> {
		let mut de = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize::<_, BasicTokenResponse>(&mut de)
			.expect_err("Fixture body should not parse as a token response.")
	}

	#[test]
	fn plain_text_error_bodies_are_classified_from_the_preview() {
		let body = b"<html>error=invalid_scope</html>";
		let meta = ResponseMetadata { status: Some(400), retry_after: None };
		let err =
			map_unparsed_body(&DefaultProviderStrategy, Some(&meta), parse_failure(body), body);

		match err {
			Error::InsufficientScope { reason } => assert!(reason.starts_with("HTTP 400: <html>")),
			other => panic!("Unexpected error variant: {other:?}."),
		}

		let body = b"upstream maintenance";
		let meta = ResponseMetadata { status: Some(503), retry_after: Some(Duration::seconds(30)) };
		let err =
			map_unparsed_body(&DefaultProviderStrategy, Some(&meta), parse_failure(body), body);

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenEndpoint { status: Some(503), retry_after, .. })
				if retry_after == Some(Duration::seconds(30))
		));
	}

	#[test]
	fn unreadable_success_bodies_stay_parse_failures() {
		let body = b"not json";
		let meta = ResponseMetadata { status: Some(200), retry_after: None };
		let err =
			map_unparsed_body(&DefaultProviderStrategy, Some(&meta), parse_failure(body), body);

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenResponseParse { status: Some(200), .. })
		));
	}

	#[test]
	fn granted_scopes_split_on_the_configured_delimiter() {
		let echoed = [Scope::new("core.read,core.write".into())];
		let granted = granted_scopes(&echoed, ',').expect("Echoed scopes should normalize.");

		assert!(granted.contains("core.read"));
		assert!(granted.contains("core.write"));
		assert_eq!(granted.len(), 2);

		let spaced = [Scope::new("core.read".into()), Scope::new("core.write".into())];

		assert_eq!(granted_scopes(&spaced, ' ').expect("Spaced scopes should normalize."), granted);
	}
}

//! Deserializable configuration and its validated conversion into runtime types.
//!
//! ```json
//! {
//!   "downstream": { "name": "core-api", "base_url": "https://core.example.com/api" },
//!   "credentials": {
//!     "provider": "identity",
//!     "token_endpoint": "https://idp.example.com/connect/token",
//!     "client_id": "dispatch-api",
//!     "client_secret": "s3cr3t",
//!     "scope": ["core.read"],
//!     "cache": { "preemptive_window_secs": 60 }
//!   },
//!   "tenant_headers": { "agency": "x-agency-id", "branch": "x-branch-id" }
//! }
//! ```

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::header::HeaderMap;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, ProviderId, ScopeSet, TokenSecret},
	error::ConfigError,
	http::ReqwestHttpClient,
	outbound::{
		AuthenticatedClient, Downstream, PassThroughAuthenticator, ServiceCredentialAuthenticator,
		ServiceCredentials, TenantHeaderNames, TokenPolicy,
	},
	provider::{ClientAuthMethod, DefaultProviderStrategy, ProviderDescriptor},
};

/// Top-level configuration for one downstream service.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutboundConfig {
	/// Target service.
	pub downstream: DownstreamConfig,
	/// Service credentials; required only for the service-credential variant.
	#[serde(default)]
	pub credentials: Option<ServiceCredentialConfig>,
	/// Tenant header names used by the pass-through variant.
	#[serde(default)]
	pub tenant_headers: TenantHeaderConfig,
}
impl OutboundConfig {
	/// Parses a JSON document, reporting the path of the first offending field.
	pub fn from_json(json: &str) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_str(json);

		serde_path_to_error::deserialize(&mut de).map_err(|source| ConfigError::Parse { source })
	}

	/// Builds a client that attaches service-credential bearer tokens.
	pub fn service_client(
		&self,
		client: ReqwestClient,
	) -> Result<AuthenticatedClient<ServiceCredentialAuthenticator>> {
		let credentials = self.credentials.as_ref().ok_or(ConfigError::MissingCredentials)?;
		let authenticator = credentials.build_authenticator(client.clone())?;

		Ok(AuthenticatedClient::new(client, self.downstream.downstream(), authenticator))
	}

	/// Builds a client forwarding the identity found in `inbound` headers.
	pub fn pass_through_client(
		&self,
		client: ReqwestClient,
		inbound: &HeaderMap,
	) -> Result<AuthenticatedClient<PassThroughAuthenticator>, ConfigError> {
		let names = self.tenant_headers.names()?;
		let authenticator = PassThroughAuthenticator::from_headers(inbound, names);

		Ok(AuthenticatedClient::new(client, self.downstream.downstream(), authenticator))
	}
}

/// Downstream service settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownstreamConfig {
	/// Name used in spans and metrics.
	pub name: String,
	/// Base URL request paths resolve against.
	pub base_url: Url,
}
impl DownstreamConfig {
	/// Runtime descriptor.
	pub fn downstream(&self) -> Downstream {
		Downstream::new(self.name.clone(), self.base_url.clone())
	}
}

/// Tenant header names as plain strings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantHeaderConfig {
	/// Agency identifier header.
	pub agency: String,
	/// Branch identifier header.
	pub branch: String,
}
impl TenantHeaderConfig {
	/// Validates the names.
	pub fn names(&self) -> Result<TenantHeaderNames, ConfigError> {
		TenantHeaderNames::new(&self.agency, &self.branch)
	}
}
impl Default for TenantHeaderConfig {
	fn default() -> Self {
		Self {
			agency: TenantHeaderNames::DEFAULT_AGENCY.into(),
			branch: TenantHeaderNames::DEFAULT_BRANCH.into(),
		}
	}
}

/// Identity provider and client registration for the service-credential variant.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceCredentialConfig {
	/// Provider identifier.
	pub provider: ProviderId,
	/// Token endpoint URL.
	pub token_endpoint: Url,
	/// How the client authenticates to the token endpoint.
	#[serde(default)]
	pub client_auth_method: ClientAuthMethod,
	/// OAuth client identifier.
	pub client_id: ClientId,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Requested scopes.
	#[serde(default)]
	pub scope: ScopeSet,
	/// Scope delimiter expected by the provider.
	#[serde(default = "default_scope_delimiter")]
	pub scope_delimiter: char,
	/// Per-request token endpoint timeout in seconds.
	#[serde(default)]
	pub token_timeout_secs: Option<u64>,
	/// Enables [`TokenPolicy::Cached`] when present.
	#[serde(default)]
	pub cache: Option<TokenCacheConfig>,
}
impl ServiceCredentialConfig {
	/// Token reuse policy derived from the `cache` section.
	pub fn policy(&self) -> TokenPolicy {
		match &self.cache {
			Some(cache) => TokenPolicy::cached_with_window(Duration::seconds(
				i64::try_from(cache.preemptive_window_secs).unwrap_or(i64::MAX),
			)),
			None => TokenPolicy::PerRequest,
		}
	}

	/// Validates the settings and assembles runtime credentials.
	pub fn credentials(&self) -> Result<ServiceCredentials, ConfigError> {
		if self.client_secret.expose().is_empty() {
			return Err(ConfigError::EmptyClientSecret);
		}

		let descriptor = ProviderDescriptor::builder(self.provider.clone())
			.token_endpoint(self.token_endpoint.clone())
			.client_auth_method(self.client_auth_method)
			.scope_delimiter(self.scope_delimiter)
			.build()?;

		Ok(ServiceCredentials {
			descriptor,
			client_id: self.client_id.clone(),
			client_secret: self.client_secret.clone(),
			scope: self.scope.clone(),
			policy: self.policy(),
		})
	}

	/// Builds an authenticator using `client` for token requests.
	pub fn build_authenticator(
		&self,
		client: ReqwestClient,
	) -> Result<ServiceCredentialAuthenticator> {
		let mut http_client = ReqwestHttpClient::with_client(client);

		if let Some(secs) = self.token_timeout_secs {
			http_client = http_client.with_timeout(StdDuration::from_secs(secs));
		}

		ServiceCredentialAuthenticator::new(
			self.credentials()?,
			http_client,
			Arc::new(DefaultProviderStrategy),
		)
	}
}

/// Cache settings; presence of the section enables caching.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenCacheConfig {
	/// Refresh this many seconds before expiry.
	#[serde(default = "default_preemptive_window_secs")]
	pub preemptive_window_secs: u64,
}

fn default_scope_delimiter() -> char {
	' '
}

fn default_preemptive_window_secs() -> u64 {
	60
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::{AUTHORIZATION, HeaderValue};
	// self
	use super::*;

	const FULL: &str = r#"{
		"downstream": { "name": "core-api", "base_url": "https://core.example.com/api" },
		"credentials": {
			"provider": "identity",
			"token_endpoint": "https://idp.example.com/connect/token",
			"client_id": "dispatch-api",
			"client_secret": "s3cr3t",
			"scope": ["core.write", "core.read"],
			"token_timeout_secs": 5,
			"cache": {}
		},
		"tenant_headers": { "agency": "AgencyId", "branch": "BranchId" }
	}"#;

	#[test]
	fn full_document_converts_to_runtime_types() {
		let config = OutboundConfig::from_json(FULL).expect("Full config fixture should parse.");
		let section = config.credentials.as_ref().expect("Credentials section should be present.");
		let credentials = section.credentials().expect("Credentials should validate.");

		assert_eq!(credentials.descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost);
		assert_eq!(credentials.scope.to_string(), "core.read core.write");
		assert_eq!(credentials.policy, TokenPolicy::cached());
		assert_eq!(section.token_timeout_secs, Some(5));
		assert!(config.service_client(ReqwestClient::new()).is_ok());
		assert_eq!(
			config.tenant_headers.names().expect("Header names should parse.").agency.as_str(),
			"agencyid"
		);
	}

	#[test]
	fn missing_sections_fall_back_to_defaults() {
		let config = OutboundConfig::from_json(
			r#"{ "downstream": { "name": "core-api", "base_url": "https://core.example.com" } }"#,
		)
		.expect("Minimal config fixture should parse.");
		let mut inbound = HeaderMap::new();

		inbound.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
		inbound.insert("x-agency-id", HeaderValue::from_static("7"));

		let client = config
			.pass_through_client(ReqwestClient::new(), &inbound)
			.expect("Pass-through client should build.");

		assert_eq!(config.tenant_headers, TenantHeaderConfig::default());
		let context = client.authenticator().context();

		assert_eq!(context.agency_id().map(HeaderValue::as_bytes), Some(&b"7"[..]));
		assert!(context.branch_id().is_none());
		assert!(matches!(
			config.service_client(ReqwestClient::new()),
			Err(Error::Config(ConfigError::MissingCredentials))
		));
	}

	#[test]
	fn parse_errors_report_the_offending_path() {
		let err = OutboundConfig::from_json(
			r#"{
				"downstream": { "name": "core-api", "base_url": "https://core.example.com" },
				"credentials": {
					"provider": "identity",
					"token_endpoint": "https://idp.example.com/token",
					"client_id": "dispatch api",
					"client_secret": "s3cr3t"
				}
			}"#,
		)
		.expect_err("Whitespace in client ids must be rejected.");

		match err {
			ConfigError::Parse { source } =>
				assert_eq!(source.path().to_string(), "credentials.client_id"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn invalid_credentials_are_rejected() {
		let mut section = OutboundConfig::from_json(FULL)
			.expect("Full config fixture should parse.")
			.credentials
			.expect("Credentials section should be present.");

		section.client_secret = TokenSecret::new("");

		assert!(matches!(section.credentials(), Err(ConfigError::EmptyClientSecret)));

		section.client_secret = TokenSecret::new("s3cr3t");
		section.token_endpoint =
			Url::parse("http://idp.example.com/token").expect("Fixture URL should parse.");

		assert!(matches!(section.credentials(), Err(ConfigError::Descriptor(_))));
	}

	#[test]
	fn cache_window_is_configurable() {
		let mut section = OutboundConfig::from_json(FULL)
			.expect("Full config fixture should parse.")
			.credentials
			.expect("Credentials section should be present.");

		section.cache = Some(TokenCacheConfig { preemptive_window_secs: 15 });

		assert_eq!(
			section.policy(),
			TokenPolicy::Cached { preemptive_window: Duration::seconds(15) }
		);

		section.cache = None;

		assert_eq!(section.policy(), TokenPolicy::PerRequest);
	}
}

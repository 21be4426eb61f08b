//! Outbound request authenticator: attach client-credentials bearer tokens or forward the
//! end-user's identity and tenant headers on every call to a downstream HTTP API.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod ext;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod outbound;
pub mod provider;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ClientId, ProviderId},
		http::ReqwestHttpClient,
		outbound::{
			AuthenticatedClient, Downstream, ServiceCredentialAuthenticator, ServiceCredentials,
			TokenPolicy,
		},
		provider::{ClientAuthMethod, DefaultProviderStrategy, ProviderDescriptor},
	};

	/// Builds a reqwest client that accepts the self-signed certificates produced by `httpmock`
	/// during tests.
	pub fn test_reqwest_client() -> ReqwestClient {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Builds a descriptor pointing at the provided token endpoint with form-body client auth.
	pub fn test_descriptor(token_endpoint: &str) -> ProviderDescriptor {
		let id = ProviderId::new("mock-idp").expect("Mock provider identifier should be valid.");

		ProviderDescriptor::builder(id)
			.token_endpoint(
				Url::parse(token_endpoint).expect("Mock token endpoint should parse successfully."),
			)
			.client_auth_method(ClientAuthMethod::ClientSecretPost)
			.build()
			.expect("Mock provider descriptor should build successfully.")
	}

	/// Builds a service-credential authenticator with the given policy against `token_endpoint`.
	pub fn build_test_service_authenticator(
		token_endpoint: &str,
		client_id: &str,
		client_secret: &str,
		policy: TokenPolicy,
	) -> ServiceCredentialAuthenticator {
		let client_id = ClientId::new(client_id).expect("Mock client identifier should be valid.");
		let credentials =
			ServiceCredentials::new(test_descriptor(token_endpoint), client_id, client_secret)
				.with_policy(policy);

		ServiceCredentialAuthenticator::new(
			credentials,
			ReqwestHttpClient::with_client(test_reqwest_client()),
			Arc::new(DefaultProviderStrategy),
		)
		.expect("Mock service authenticator should build successfully.")
	}

	/// Wraps `authenticator` in an [`AuthenticatedClient`] targeting `base_url`.
	pub fn build_test_client<A>(base_url: &str, authenticator: A) -> AuthenticatedClient<A>
	where
		A: crate::outbound::RequestAuthenticator,
	{
		let downstream = Downstream::new(
			"mock-core-api",
			Url::parse(base_url).expect("Mock downstream base URL should parse successfully."),
		);

		AuthenticatedClient::new(test_reqwest_client(), downstream, authenticator)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, hash_map::DefaultHasher},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{
		Client as ReqwestClient, Error as ReqwestError, Request as ReqwestRequest,
		Response as ReqwestResponse,
	};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	provider::{ClientAuthMethod, ProviderDescriptor},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Scope delimiters cannot be control characters.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	id: ProviderId,
	token_endpoint: Option<Url>,
	client_auth_method: ClientAuthMethod,
	scope_delimiter: char,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			token_endpoint: None,
			client_auth_method: ClientAuthMethod::default(),
			scope_delimiter: ' ',
		}
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Overrides the scope delimiter (defaults to a space).
	pub fn scope_delimiter(mut self, delimiter: char) -> Self {
		self.scope_delimiter = delimiter;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let token_endpoint =
			self.token_endpoint.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let descriptor = ProviderDescriptor {
			id: self.id,
			token_endpoint,
			client_auth_method: self.client_auth_method,
			scope_delimiter: self.scope_delimiter,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates descriptor invariants; also used after deserialization.
	pub fn validate(&self) -> Result<(), ProviderDescriptorError> {
		if !is_secure(&self.token_endpoint) {
			return Err(ProviderDescriptorError::InsecureEndpoint {
				url: self.token_endpoint.to_string(),
			});
		}
		if self.scope_delimiter.is_control() {
			return Err(ProviderDescriptorError::InvalidScopeDelimiter {
				delimiter: self.scope_delimiter,
			});
		}

		Ok(())
	}
}

// Plain HTTP is only tolerated for loopback hosts (local identity servers, test doubles).
fn is_secure(url: &Url) -> bool {
	match url.scheme() {
		"https" => true,
		"http" => match url.host() {
			Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
			Some(url::Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
			Some(url::Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
			None => false,
		},
		_ => false,
	}
}

//! Validated identifiers for identity providers and OAuth clients.
//!
//! Provider identifiers double as span fields and metric labels, so they are restricted to a
//! label-safe ASCII alphabet. Client identifiers are whatever the identity provider issued, but
//! they travel in form bodies and `Basic` credentials and must stay free of whitespace and
//! control characters.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $rule:ident) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl Into<String>) -> Result<Self, IdentifierError> {
				Self::try_from(value.into())
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$rule.check($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (provider, client).
		kind: &'static str,
	},
	/// The identifier contains a character its kind does not allow.
	#[error("{kind} identifier contains the disallowed character {character:?}.")]
	InvalidCharacter {
		/// Kind of identifier (provider, client).
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The identifier exceeded the allowed length.
	#[error("{kind} identifier exceeds {max} bytes.")]
	TooLong {
		/// Kind of identifier (provider, client).
		kind: &'static str,
		/// Maximum permitted length in bytes.
		max: usize,
	},
}

struct Rule {
	max_len: usize,
	allowed: fn(char) -> bool,
}
impl Rule {
	fn check(&self, kind: &'static str, value: &str) -> Result<(), IdentifierError> {
		if value.is_empty() {
			return Err(IdentifierError::Empty { kind });
		}
		if let Some(character) = value.chars().find(|c| !(self.allowed)(*c)) {
			return Err(IdentifierError::InvalidCharacter { kind, character });
		}
		if value.len() > self.max_len {
			return Err(IdentifierError::TooLong { kind, max: self.max_len });
		}

		Ok(())
	}
}

const PROVIDER_RULE: Rule = Rule {
	max_len: 64,
	allowed: |c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'),
};
const CLIENT_RULE: Rule =
	Rule { max_len: 255, allowed: |c| !c.is_whitespace() && !c.is_control() };

def_id! {
	ProviderId,
	"Label-safe identifier for an identity provider descriptor.",
	"Provider",
	PROVIDER_RULE
}
def_id! {
	ClientId,
	"OAuth client identifier presented to the token endpoint.",
	"Client",
	CLIENT_RULE
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn provider_ids_are_label_safe() {
		ProviderId::new("corp-idp_v2.eu").expect("Label-safe provider identifier should pass.");

		assert_eq!(
			ProviderId::new("identity server"),
			Err(IdentifierError::InvalidCharacter { kind: "Provider", character: ' ' })
		);
		assert_eq!(
			ProviderId::new("idp/eu"),
			Err(IdentifierError::InvalidCharacter { kind: "Provider", character: '/' })
		);
		assert_eq!(
			ProviderId::new("p".repeat(65)),
			Err(IdentifierError::TooLong { kind: "Provider", max: 64 })
		);
	}

	#[test]
	fn client_ids_accept_issued_formats() {
		let client = ClientId::new("urn:fuel:dispatch-api@corp")
			.expect("Provider-issued client identifiers may carry punctuation.");

		assert_eq!(client.as_ref(), "urn:fuel:dispatch-api@corp");
		assert_eq!(format!("{client:?}"), "Client(urn:fuel:dispatch-api@corp)");
		assert_eq!(ClientId::new(""), Err(IdentifierError::Empty { kind: "Client" }));
		assert!(ClientId::new(" dispatch-api").is_err(), "Leading whitespace must be rejected.");
		assert!(ClientId::new("dispatch\u{7}").is_err(), "Control characters must be rejected.");

		ClientId::new("c".repeat(255)).expect("Exact length should succeed.");
	}

	#[test]
	fn deserialization_enforces_validation() {
		let client: ClientId = serde_json::from_str("\"fuel-dispatch\"")
			.expect("Client identifier should deserialize successfully.");

		assert_eq!(&*client, "fuel-dispatch");
		assert!(serde_json::from_str::<ClientId>("\"fuel dispatch\"").is_err());
		assert!(serde_json::from_str::<ProviderId>("\"idp:eu\"").is_err());
	}
}

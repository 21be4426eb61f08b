//! Identity-provider descriptors (data) and strategies (behavior).
//!
//! `descriptor` holds validated token-endpoint metadata and the client authentication
//! preference. `strategy` defines [`ProviderStrategy`], the hook used to add provider-specific
//! form fields and to classify token endpoint failures.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;

//! Extension contracts for attaching issued tokens to arbitrary HTTP request types.

pub mod request_signer;

pub use request_signer::*;

//! Credential models: redacted secrets, credential pairs, and access-token expiry claims.

pub mod claims;
pub mod credentials;
pub mod secret;

pub use claims::*;
pub use credentials::*;
pub use secret::*;

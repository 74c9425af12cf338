//! quizmill-client — backend integrations.
//!
//! Implements the collaborator traits from `quizmill-core` against the
//! remote course backend over REST, plus a scriptable in-process mock for
//! tests and offline runs.

pub mod config;
pub mod error;
pub mod mock;
pub mod rest;

pub use config::{create_backend, load_config, BackendConfig, ClientConfig};
pub use error::BackendError;
pub use mock::MockBackend;
pub use rest::RestBackend;

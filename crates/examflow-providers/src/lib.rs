//! examflow-providers — exam backend integrations.
//!
//! Implements the `ExamContentProvider` and `AnswerPersistence` traits
//! over HTTP for a remote exam backend, and over local TOML files for
//! offline runs and testing.

pub mod config;
pub mod error;
pub mod http;
pub mod local;

pub use config::{create_remote_service, load_config, load_config_from, ExamflowConfig};
pub use error::TransportError;
pub use http::HttpExamService;
pub use local::LocalExamService;

//! Core building blocks shared by every operation.
//!
//! - **Configuration** (`config`): `ServiceConfig` loading from TOML/YAML/JSON plus environment overrides
//! - **MIME checks** (`mime`): upload validation by extension, declared type and magic bytes
//! - **Naming** (`naming`): filesystem-safe names and run identifiers
//! - **Processes** (`process`): external tool execution with timeouts

pub mod config;
pub mod mime;
pub mod naming;
pub mod process;

pub use config::ServiceConfig;
pub use naming::{new_run_id, safe_base_name, unique_stage_name};

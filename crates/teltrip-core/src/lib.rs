//! # teltrip-core
//!
//! Shared plumbing for the teltrip workspace.
//!
//! This crate provides:
//! - [`CoreError`] - Errors raised while loading configuration or setting up logging
//! - [`config`] - [`AppConfig`] with OCS connection and pipeline settings
//! - [`logging`] - Tracing setup and logging macros
//!
//! ## Example
//!
//! ```no_run
//! use teltrip_core::{AppConfig, logging};
//!
//! fn main() -> teltrip_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!     let config = AppConfig::load(None)?;
//!     tracing::info!(epoch = %config.pipeline.epoch_start, "config loaded");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    AppConfig, OcsConfig, PipelineConfig, SubscriberFailurePolicy, WindowFailurePolicy,
};
pub use error::{CoreError, Result};
pub use logging::{LogGuard, init_logging};

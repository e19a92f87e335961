//! Supervision core.
//!
//! - [`supervisor`]: the [`Supervisor`] service, its child loop and teardown;
//! - [`builder`]: [`SupervisorBuilder`];
//! - [`config`]: [`SupervisorConfig`];
//! - [`actor`]: keeps one child running per its restart/backoff policies;
//! - [`runner`]: one `serve` call with panic capture and event publishing.

mod actor;
mod builder;
mod config;
mod runner;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use supervisor::Supervisor;

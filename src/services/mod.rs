//! Services: the lifecycle state machine and the contract around it.
//!
//! - [`Status`] lifecycle states with stable numeric values
//! - [`Run`], [`RunFn`] the unit of work executed per run-cycle, [`Teardown`] its cleanup
//! - [`BaseService`] the state machine (serve / status / ready / stop)
//! - [`Service`] the trait supervisors and combinators consume
//! - [`ServiceSpec`] a child plus its restart/backoff policies

mod base;
mod run_fn;
mod service;
mod spec;
mod status;

pub use base::{BaseService, BaseServiceBuilder, ReadySignal, StoppedHandle};
pub use run_fn::{BoxRunFuture, Run, RunFn, RunRef, Teardown, TeardownRef};
pub use service::{Service, ServiceRef, start};
pub use spec::ServiceSpec;
pub use status::Status;

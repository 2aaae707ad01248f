//! Alphabill backend integration
//!
//! Async service interface to the Alphabill money backend, bounded proof
//! polling with cancellation, and the send pipeline that ties bill selection,
//! signing and submission together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cancel;
pub mod client;
pub mod error;
pub mod logging;
pub mod poll;
pub mod send;

pub use cancel::CancelToken;
pub use client::{AlphabillBackend, BackendConfig, RetryConfig, RetryingBackend, Unit};
pub use error::{Error, Result};
pub use logging::{init_tracing, LogFormat};
pub use poll::{await_proof, PollConfig};
pub use send::{FailedOrder, SendOutcome, SendPipeline, SubmittedOrder};

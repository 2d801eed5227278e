//! Client for the DEX daemon's JSON-RPC API.
//!
//! Consumed by the lightning shell and its tests. The daemon owns every
//! piece of channel and payment state; this crate only builds request
//! envelopes, injects the shared credential, and classifies replies into
//! success, domain failure, or transport error.

pub mod client;
pub mod envelope;
pub mod error;
pub mod method;
pub mod mock;
pub mod transport;

pub use client::{DexClient, DEFAULT_DEX_URL};
pub use envelope::{RpcFailure, RpcResponse, Userpass};
pub use error::{ClientError, TransportError};
pub use method::{EnvelopeShape, Method};
pub use mock::{MockTransport, RecordedCall};
pub use transport::RpcTransport;

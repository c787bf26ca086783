//! Wire protocol of the model data exchange server.
//!
//! Two model processes coordinate through a session held by the server. Every
//! HTTP request is stateless, so each one carries the full
//! [`SessionIdentifier`](modex_core::SessionIdentifier), encoded for the
//! context it travels in (query string, header or JSON body). Arrays move as
//! raw little-endian doubles.
//!
//! # Example
//!
//! ```rust
//! use modex_core::SessionIdentifier;
//! use modex_protocol::{codec, ArrayPayload};
//!
//! let id = SessionIdentifier::new(2001, 2005, 35, 38);
//! assert_eq!(codec::to_query_string(&id, "session_id"), "session_id=2001,2005,35,38,");
//!
//! let bytes = ArrayPayload::encode(&[1.5, -2.25]);
//! let decoded = ArrayPayload::decode_exact(&bytes, 2).unwrap();
//! assert_eq!(&decoded[..], &[1.5, -2.25]);
//! ```

pub mod codec;
mod endpoints;
mod error;
mod payload;
mod types;

pub use endpoints::{Endpoint, EndpointPaths};
pub use error::{ProtocolError, ProtocolResult};
pub use payload::{ArrayPayload, ELEMENT_SIZE};
pub use types::{
    CreateSessionRequest, EndSessionRequest, FlagResponse, JoinSessionRequest, ServerMessage,
    SizeResponse, VariableRequest, VariableSpec, decode_flag, decode_size, decode_status,
};

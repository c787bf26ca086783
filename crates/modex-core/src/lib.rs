//! Core types: session identifiers, variable references, session status, tracing

pub mod session;
pub mod status;
pub mod tracing;

pub use session::{
    FIELD_SEPARATOR, IdentifierError, InstanceId, MAX_INSTANCE_ID_LEN, SessionIdentifier,
    VariableRef,
};
pub use status::{SessionStatus, StatusReport};
pub use tracing::{
    LogWriter, TracingConfig, TracingError, TracingOutputFormat, build_subscriber, init_tracing,
};

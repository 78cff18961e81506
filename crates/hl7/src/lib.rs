//! HL7 version 2 support for the pipe-delimited ("ER7") encoding.
//!
//! This is deliberately small: parsing into segments, fields and components, building
//! acknowledgments, and converting `DTM` values. There is no MLLP transport.

pub mod ack;
pub mod dtm;
pub mod ids;
pub mod message;

pub use ack::{build_ack, AckCode, LocalEndpoint};
pub use ids::MessageIdGenerator;
pub use message::{parse_message, Delimiters, Message, Segment};

use thiserror::Error;

/// Errors returned by the `hl7` crate.
#[derive(Debug, Error)]
pub enum Hl7Error {
    #[error("message is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("message does not start with an MSH segment")]
    MissingMsh,

    #[error("malformed MSH segment: {0}")]
    MalformedHeader(String),

    #[error("unsupported date time format: {0}")]
    InvalidDateTime(String),
}

/// Type alias for Results that can fail with an [`Hl7Error`].
pub type Hl7Result<T> = Result<T, Hl7Error>;

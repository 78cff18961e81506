//! General acknowledgment (`ACK`) messages.

use crate::message::{Message, Segment};
use crate::Hl7Result;

/// Acknowledgment code written to `MSA-1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckCode {
    Accept,
    Error,
    Reject,
}

impl AckCode {
    pub fn as_str(self) -> &'static str {
        match self {
            AckCode::Accept => "AA",
            AckCode::Error => "AE",
            AckCode::Reject => "AR",
        }
    }
}

/// Application and facility of this system.
///
/// Only used when the original message leaves its receiving application (`MSH-5`) or
/// facility (`MSH-6`) empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalEndpoint {
    pub application: String,
    pub facility: String,
}

/// Build the acknowledgment of `original`.
///
/// Sending and receiving application/facility are swapped, `MSH-9` repeats the original
/// message type, and `MSA-2` references the original control id.
pub fn build_ack(
    original: &Message,
    code: AckCode,
    message_id: &str,
    now: &str,
    local: &LocalEndpoint,
) -> Hl7Result<Message> {
    let msh = original.header();
    let delimiters = original.delimiters();
    let or_local = |value: &str, fallback: &str| {
        if value.is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };

    let header = Segment::new(
        "MSH",
        vec![
            msh.field(1).to_string(),
            msh.field(2).to_string(),
            or_local(msh.field(5), &local.application),
            or_local(msh.field(6), &local.facility),
            msh.field(3).to_string(),
            msh.field(4).to_string(),
            now.to_string(),
            String::new(),
            msh.field(9).to_string(),
            message_id.to_string(),
            "P".to_string(),
            msh.field(12).to_string(),
        ],
        delimiters,
    );
    let msa = Segment::new(
        "MSA",
        vec![code.as_str().to_string(), original.control_id().to_string()],
        delimiters,
    );
    Message::new(vec![header, msa])
}

//! Merchant references.
//!
//! The merchant reference (`RefNo`) is the only value we choose that survives the round trip through the gateway. It
//! carries the fulfilment target: `ORD-{slot_id}-{unix_timestamp}`.
use log::debug;
use thiserror::Error;

use crate::db_types::SlotId;

pub const REFERENCE_PREFIX: &str = "ORD";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("The slot id must not be empty.")]
    EmptyTarget,
    #[error("The slot id '{0}' contains a '-', which would make the reference undecodable.")]
    InvalidTarget(String),
    #[error("The timestamp {0} is negative, and would not decode.")]
    NegativeTimestamp(i64),
}

/// The result of decoding a reference. Decoding never fails outright: anything that is not a well-formed reference is
/// `Unresolved` so that the notification can still be acknowledged and routed to manual reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedReference {
    Target(SlotId),
    Unresolved,
}

impl DecodedReference {
    pub fn target(&self) -> Option<&SlotId> {
        match self {
            Self::Target(id) => Some(id),
            Self::Unresolved => None,
        }
    }
}

pub fn encode_reference(target: &SlotId, timestamp: i64) -> Result<String, ReferenceError> {
    let id = target.as_str();
    if id.is_empty() {
        return Err(ReferenceError::EmptyTarget);
    }
    if id.contains('-') {
        return Err(ReferenceError::InvalidTarget(id.to_string()));
    }
    if timestamp < 0 {
        return Err(ReferenceError::NegativeTimestamp(timestamp));
    }
    Ok(format!("{REFERENCE_PREFIX}-{id}-{timestamp}"))
}

pub fn decode_reference(reference: &str) -> DecodedReference {
    let tokens = reference.split('-').collect::<Vec<_>>();
    match tokens.as_slice() {
        [prefix, target, timestamp]
            if *prefix == REFERENCE_PREFIX &&
                !target.is_empty() &&
                !timestamp.is_empty() &&
                timestamp.chars().all(|c| c.is_ascii_digit()) =>
        {
            DecodedReference::Target(SlotId::from(*target))
        },
        _ => {
            debug!("🏷️ Reference '{reference}' does not have the form {REFERENCE_PREFIX}-<slot>-<timestamp>");
            DecodedReference::Unresolved
        },
    }
}

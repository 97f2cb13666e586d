//! The projection handler contract.
//!
//! A handler is a pure fold step: given the prior record for an entity and
//! a committed event, produce the next record. Determinism is the whole
//! contract; replaying the same events must yield byte-identical records,
//! so handlers derive every timestamp from `event.timestamp` and never read
//! the wall clock, random state, or anything outside the event.

use concord_core::{ConcordResult, EventEnvelope, ProjectionError};
use serde_json::Value;

/// A deterministic fold from events to per-entity records.
///
/// Records cross the storage boundary as JSON values; concrete handlers
/// serialize their typed record on the way out and deserialize the prior on
/// the way in.
pub trait ProjectionHandler: Send + Sync {
    /// Stable projection name; keys the apply log and checkpoint cursor.
    fn name(&self) -> &'static str;

    /// The entity key an event addresses, or `None` when this projection
    /// does not handle the event type. Unhandled events still advance the
    /// cursor and apply log, so a resumed run never revisits them.
    fn entity_key(&self, event: &EventEnvelope) -> ConcordResult<Option<String>>;

    /// Fold one event into the entity's record.
    fn apply(&self, prior: Option<Value>, event: &EventEnvelope) -> ConcordResult<Value>;
}

/// Decode a payload field as a string, failing with handler context.
pub(crate) fn payload_str<'a>(
    handler: &dyn ProjectionHandler,
    event: &'a EventEnvelope,
    field: &str,
) -> ConcordResult<&'a str> {
    event
        .payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ProjectionError::HandlerFailed {
                projection: handler.name().to_string(),
                event_type: event.event_type.clone(),
                reason: format!("payload field `{field}` missing or not a string"),
            }
            .into()
        })
}

/// Decode the prior record into its typed form.
pub(crate) fn decode_prior<T: serde::de::DeserializeOwned>(
    handler: &dyn ProjectionHandler,
    event: &EventEnvelope,
    prior: Value,
) -> ConcordResult<T> {
    serde_json::from_value(prior).map_err(|e| {
        ProjectionError::HandlerFailed {
            projection: handler.name().to_string(),
            event_type: event.event_type.clone(),
            reason: format!("prior record does not decode: {e}"),
        }
        .into()
    })
}

/// Encode a typed record back to its stored form.
pub(crate) fn encode_record<T: serde::Serialize>(
    handler: &dyn ProjectionHandler,
    event: &EventEnvelope,
    record: &T,
) -> ConcordResult<Value> {
    serde_json::to_value(record).map_err(|e| {
        ProjectionError::HandlerFailed {
            projection: handler.name().to_string(),
            event_type: event.event_type.clone(),
            reason: format!("record does not encode: {e}"),
        }
        .into()
    })
}

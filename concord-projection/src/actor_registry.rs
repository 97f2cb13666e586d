//! Actor registry projection: who may author events, and in what standing.

use concord_core::{
    kinds, ActorRecord, ActorStatus, ConcordResult, EventEnvelope, ProjectionError, Provenance,
};
use serde_json::Value;

use crate::handler::{decode_prior, encode_record, payload_str, ProjectionHandler};

/// Folds actor lifecycle events into [`ActorRecord`]s keyed by actor id.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActorRegistryProjection;

pub const ACTOR_REGISTRY: &str = "actor_registry";

impl ActorRegistryProjection {
    fn provenance(event: &EventEnvelope) -> Provenance {
        Provenance {
            last_event_sequence: event.sequence,
            last_event_hash: event.hash.clone(),
        }
    }

    fn fail(&self, event: &EventEnvelope, reason: impl Into<String>) -> concord_core::ConcordError {
        ProjectionError::HandlerFailed {
            projection: ACTOR_REGISTRY.to_string(),
            event_type: event.event_type.clone(),
            reason: reason.into(),
        }
        .into()
    }

    fn registered(&self, event: &EventEnvelope) -> ConcordResult<ActorRecord> {
        let subject = payload_str(self, event, "subject_id")?;
        let name = payload_str(self, event, "name")?;
        Ok(ActorRecord {
            actor_id: subject.to_string(),
            display_name: name.to_string(),
            status: ActorStatus::Active,
            registered_at: event.timestamp,
            updated_at: event.timestamp,
            provenance: Self::provenance(event),
        })
    }

    fn updated(
        &self,
        prior: Option<Value>,
        event: &EventEnvelope,
        status: Option<ActorStatus>,
    ) -> ConcordResult<ActorRecord> {
        let prior =
            prior.ok_or_else(|| self.fail(event, "update for an actor that never registered"))?;
        let mut record: ActorRecord = decode_prior(self, event, prior)?;
        if let Some(status) = status {
            record.status = status;
        }
        if let Some(name) = event.payload.get("name").and_then(Value::as_str) {
            record.display_name = name.to_string();
        }
        record.updated_at = event.timestamp;
        record.provenance = Self::provenance(event);
        Ok(record)
    }
}

impl ProjectionHandler for ActorRegistryProjection {
    fn name(&self) -> &'static str {
        ACTOR_REGISTRY
    }

    fn entity_key(&self, event: &EventEnvelope) -> ConcordResult<Option<String>> {
        match event.event_type.as_str() {
            kinds::ACTOR_REGISTERED
            | kinds::ACTOR_UPDATED
            | kinds::ACTOR_SUSPENDED
            | kinds::ACTOR_REINSTATED => {
                Ok(Some(payload_str(self, event, "subject_id")?.to_string()))
            }
            _ => Ok(None),
        }
    }

    fn apply(&self, prior: Option<Value>, event: &EventEnvelope) -> ConcordResult<Value> {
        let record = match event.event_type.as_str() {
            kinds::ACTOR_REGISTERED => self.registered(event)?,
            kinds::ACTOR_UPDATED => self.updated(prior, event, None)?,
            kinds::ACTOR_SUSPENDED => self.updated(prior, event, Some(ActorStatus::Suspended))?,
            kinds::ACTOR_REINSTATED => self.updated(prior, event, Some(ActorStatus::Active))?,
            other => return Err(self.fail(event, format!("unhandled event type `{other}`"))),
        };
        encode_record(self, event, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::{chain_events, DraftEvent, HashAlgorithm};
    use serde_json::json;
    use uuid::Uuid;

    fn committed(event_type: &str, payload: Value, sequence: u64) -> EventEnvelope {
        let mut events =
            vec![DraftEvent::new(event_type, Uuid::now_v7(), payload).into_envelope(sequence)];
        chain_events(&mut events, Some("blake3:aa"), HashAlgorithm::Blake3).unwrap();
        events.remove(0)
    }

    #[test]
    fn test_register_suspend_reinstate() {
        let handler = ActorRegistryProjection;
        let subject = Uuid::now_v7().to_string();

        let registered = committed(
            kinds::ACTOR_REGISTERED,
            json!({"subject_id": subject, "name": "Registrar"}),
            1,
        );
        let record = handler.apply(None, &registered).unwrap();
        assert_eq!(record["status"], "active");

        let suspended = committed(kinds::ACTOR_SUSPENDED, json!({"subject_id": subject}), 2);
        let record = handler.apply(Some(record), &suspended).unwrap();
        assert_eq!(record["status"], "suspended");
        assert_eq!(record["display_name"], "Registrar");

        let reinstated = committed(kinds::ACTOR_REINSTATED, json!({"subject_id": subject}), 3);
        let record = handler.apply(Some(record), &reinstated).unwrap();
        assert_eq!(record["status"], "active");
        assert_eq!(record["last_event_sequence"], 3);
    }

    #[test]
    fn test_update_renames() {
        let handler = ActorRegistryProjection;
        let subject = Uuid::now_v7().to_string();
        let registered = committed(
            kinds::ACTOR_REGISTERED,
            json!({"subject_id": subject, "name": "Old Name"}),
            1,
        );
        let record = handler.apply(None, &registered).unwrap();

        let updated = committed(
            kinds::ACTOR_UPDATED,
            json!({"subject_id": subject, "name": "New Name"}),
            2,
        );
        let record = handler.apply(Some(record), &updated).unwrap();
        assert_eq!(record["display_name"], "New Name");
    }

    #[test]
    fn test_suspend_unregistered_fails() {
        let handler = ActorRegistryProjection;
        let suspended = committed(
            kinds::ACTOR_SUSPENDED,
            json!({"subject_id": "ghost"}),
            1,
        );
        assert!(handler.apply(None, &suspended).is_err());
    }

    #[test]
    fn test_task_events_have_no_key() {
        let handler = ActorRegistryProjection;
        let event = committed(kinds::TASK_CREATED, json!({"task_id": "T-1"}), 1);
        assert!(handler.entity_key(&event).unwrap().is_none());
    }
}

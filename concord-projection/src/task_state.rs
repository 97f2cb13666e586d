//! Task state projection: current status of every governance task.

use concord_core::{
    kinds, ConcordResult, EventEnvelope, ProjectionError, Provenance, TaskStateRecord, TaskStatus,
};
use serde_json::Value;

use crate::handler::{decode_prior, encode_record, payload_str, ProjectionHandler};

/// Folds task lifecycle events into [`TaskStateRecord`]s keyed by task id.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskStateProjection;

pub const TASK_STATE: &str = "task_state";

impl TaskStateProjection {
    fn provenance(event: &EventEnvelope) -> Provenance {
        Provenance {
            last_event_sequence: event.sequence,
            last_event_hash: event.hash.clone(),
        }
    }

    fn fail(&self, event: &EventEnvelope, reason: impl Into<String>) -> concord_core::ConcordError {
        ProjectionError::HandlerFailed {
            projection: TASK_STATE.to_string(),
            event_type: event.event_type.clone(),
            reason: reason.into(),
        }
        .into()
    }

    fn created(&self, event: &EventEnvelope) -> ConcordResult<TaskStateRecord> {
        let task_id = payload_str(self, event, "task_id")?;
        let title = payload_str(self, event, "title")?;
        Ok(TaskStateRecord {
            task_id: task_id.to_string(),
            title: title.to_string(),
            status: TaskStatus::Open,
            assignee: event
                .payload
                .get("assignee")
                .and_then(Value::as_str)
                .map(String::from),
            created_at: event.timestamp,
            updated_at: event.timestamp,
            provenance: Self::provenance(event),
        })
    }

    fn transitioned(
        &self,
        prior: Option<Value>,
        event: &EventEnvelope,
        status: TaskStatus,
    ) -> ConcordResult<TaskStateRecord> {
        let prior = prior.ok_or_else(|| {
            self.fail(event, "status change for a task that was never created")
        })?;
        let mut record: TaskStateRecord = decode_prior(self, event, prior)?;
        record.status = status;
        if let Some(assignee) = event.payload.get("assignee").and_then(Value::as_str) {
            record.assignee = Some(assignee.to_string());
        }
        record.updated_at = event.timestamp;
        record.provenance = Self::provenance(event);
        Ok(record)
    }
}

impl ProjectionHandler for TaskStateProjection {
    fn name(&self) -> &'static str {
        TASK_STATE
    }

    fn entity_key(&self, event: &EventEnvelope) -> ConcordResult<Option<String>> {
        match event.event_type.as_str() {
            kinds::TASK_CREATED
            | kinds::TASK_STATUS_CHANGED
            | kinds::TASK_COMPLETED
            | kinds::TASK_CANCELLED => Ok(Some(payload_str(self, event, "task_id")?.to_string())),
            _ => Ok(None),
        }
    }

    fn apply(&self, prior: Option<Value>, event: &EventEnvelope) -> ConcordResult<Value> {
        let record = match event.event_type.as_str() {
            kinds::TASK_CREATED => self.created(event)?,
            kinds::TASK_STATUS_CHANGED => {
                let tag = payload_str(self, event, "status")?;
                let status = TaskStatus::from_tag(tag)
                    .ok_or_else(|| self.fail(event, format!("unknown status tag `{tag}`")))?;
                self.transitioned(prior, event, status)?
            }
            kinds::TASK_COMPLETED => self.transitioned(prior, event, TaskStatus::Completed)?,
            kinds::TASK_CANCELLED => self.transitioned(prior, event, TaskStatus::Cancelled)?,
            other => return Err(self.fail(event, format!("unhandled event type `{other}`"))),
        };
        encode_record(self, event, &record)
    }
}

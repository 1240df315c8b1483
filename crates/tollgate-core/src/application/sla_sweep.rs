use crate::{
    domain::events::{StageOverdue, WorkflowEventHandler},
    domain::repository::ReviewStageRepository,
    sla::{self, SlaStatus},
    CoreError,
};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Read-only SLA sweep over the open stages.
///
/// Emits a StageOverdue event per open stage past its deadline so a
/// notification collaborator can escalate. Never mutates stage state;
/// escalation is an observation, not a transition.
pub struct SlaSweeper {
    stages: Arc<dyn ReviewStageRepository>,
    event_handler: Arc<dyn WorkflowEventHandler>,
}

impl SlaSweeper {
    /// Create a new sweeper
    pub fn new(
        stages: Arc<dyn ReviewStageRepository>,
        event_handler: Arc<dyn WorkflowEventHandler>,
    ) -> Self {
        Self {
            stages,
            event_handler,
        }
    }

    /// Sweep once as of the given day. Returns the number of overdue
    /// stages observed.
    pub async fn sweep(&self, today: NaiveDate) -> Result<usize, CoreError> {
        let mut overdue = 0;

        for stage in self.stages.find_open().await? {
            if sla::calculate_sla_status(stage.due_date, today) != SlaStatus::Overdue {
                continue;
            }
            overdue += 1;

            let event = StageOverdue {
                application_id: stage.application_id,
                review_stage_id: stage.id,
                stage_name: stage.stage_name,
                due_date: stage.due_date,
                timestamp: Utc::now(),
            };
            if let Err(err) = self.event_handler.handle_event(Box::new(event)).await {
                debug!(%err, stage = %stage.id, "overdue event handler failed");
            }
        }

        if overdue > 0 {
            info!(count = overdue, "sla sweep found overdue stages");
        }
        Ok(overdue)
    }
}

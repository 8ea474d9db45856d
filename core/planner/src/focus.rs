use ryan_schemas::{CurrentFocus, NewFocus, Phase, PhaseId};
use ryan_store::{now_timestamp, Store};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::{PlannerError, Result};
use crate::scorer::{Scorer, WhatsNext};

/// Priority given to every newly set focus
pub const FOCUS_PRIORITY: i64 = 1;
pub const FOCUS_SET_BY: &str = "user";

#[derive(Debug, Clone, Serialize)]
pub struct FocusOutcome {
    pub focus: CurrentFocus,
    pub phase: Phase,
}

/// Moves phases through pending -> in_progress -> complete and keeps the
/// current-focus records in step.
pub struct FocusController {
    store: Arc<dyn Store>,
    scorer: Arc<Scorer>,
}

impl FocusController {
    pub fn new(store: Arc<dyn Store>, scorer: Arc<Scorer>) -> Self {
        Self { store, scorer }
    }

    /// Starts the phase and adds an active focus record for it. Other active
    /// focus records are left alone.
    pub fn set_focus(&self, phase_id: &PhaseId, rationale: Option<&str>) -> Result<FocusOutcome> {
        let phase = self
            .store
            .get_phase(phase_id)?
            .ok_or_else(|| PlannerError::NotFound {
                entity: "phase",
                id: phase_id.to_string(),
            })?;

        let started = self.store.start_phase(phase_id, &now_timestamp())?;

        let rationale = rationale
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Focus set on {}", phase.name));

        let focus = self.store.insert_focus(&NewFocus {
            project_id: phase.project_id.clone(),
            phase_id: phase_id.clone(),
            priority: FOCUS_PRIORITY,
            rationale,
            set_by: FOCUS_SET_BY.to_string(),
        })?;

        info!("Focus set: {} ({})", started.name, started.id);
        Ok(FocusOutcome {
            focus,
            phase: started,
        })
    }

    /// Retires the phase's active focus and marks it complete. With no phase
    /// id there is nothing to retire.
    pub fn complete(&self, phase_id: Option<&PhaseId>) -> Result<Option<Phase>> {
        let Some(phase_id) = phase_id else {
            return Ok(None);
        };

        let phase = self.store.complete_phase(phase_id, &now_timestamp())?;
        info!("Completed phase: {} ({})", phase.name, phase.id);
        Ok(Some(phase))
    }

    /// Complete-then-recompute
    pub fn complete_and_recommend(&self, phase_id: Option<&PhaseId>) -> Result<WhatsNext> {
        self.complete(phase_id)?;
        self.scorer.whats_next()
    }
}

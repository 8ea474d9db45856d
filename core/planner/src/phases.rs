use ryan_schemas::{
    DependencyDetail, DependencyId, NewDependency, NewPhase, Phase, PhaseDependency, PhaseId,
    PhasePatch, PhaseStatus, PhaseWithDeps, ProjectId, DEFAULT_DEPENDENCY_TYPE,
};
use ryan_store::{now_timestamp, Store};
use std::sync::Arc;
use tracing::info;

use crate::error::{required, PlannerError, Result};

/// Fields accepted when adding a phase to a project
#[derive(Debug, Clone, Default)]
pub struct PhaseDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<PhaseStatus>,
    pub sort_order: Option<i64>,
}

/// Phase and dependency maintenance outside the focus workflow
pub struct PhaseService {
    store: Arc<dyn Store>,
}

impl PhaseService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn list_for_project(&self, project_id: &ProjectId) -> Result<Vec<Phase>> {
        Ok(self.store.list_project_phases(project_id)?)
    }

    pub fn create(&self, project_id: &ProjectId, draft: PhaseDraft) -> Result<Phase> {
        let name = required(draft.name, "Name is required")?;

        let phase = self.store.insert_phase(&NewPhase {
            project_id: project_id.clone(),
            name,
            description: draft.description,
            status: draft.status.unwrap_or(PhaseStatus::Pending),
            sort_order: draft.sort_order.unwrap_or(0),
        })?;

        info!("Created phase: {} ({})", phase.name, phase.id);
        Ok(phase)
    }

    /// Partial update. Entering in_progress stamps `started_at` and entering
    /// complete stamps `completed_at` unless the caller supplied them;
    /// completion also retires the phase's active focus.
    pub fn update(&self, id: &PhaseId, mut patch: PhasePatch) -> Result<Phase> {
        let now = now_timestamp();

        match patch.status {
            Some(PhaseStatus::InProgress) if patch.started_at.is_none() => {
                patch.started_at = Some(now.clone());
            }
            Some(PhaseStatus::Complete) if patch.completed_at.is_none() => {
                patch.completed_at = Some(now.clone());
            }
            _ => {}
        }

        Ok(self.store.update_phase(id, &patch, &now)?)
    }

    pub fn delete(&self, id: &PhaseId) -> Result<()> {
        if !self.store.delete_phase(id)? {
            return Err(PlannerError::not_found("phase", id));
        }
        info!("Deleted phase: {}", id);
        Ok(())
    }

    pub fn dependencies(&self, phase_id: &PhaseId) -> Result<Vec<DependencyDetail>> {
        if self.store.get_phase(phase_id)?.is_none() {
            return Err(PlannerError::not_found("phase", phase_id));
        }
        Ok(self.store.list_dependencies(phase_id)?)
    }

    /// Only direct self-loops are rejected; longer cycles are not detected
    pub fn add_dependency(
        &self,
        phase_id: Option<PhaseId>,
        depends_on_phase_id: Option<PhaseId>,
        dependency_type: Option<String>,
        notes: Option<String>,
    ) -> Result<PhaseDependency> {
        let (Some(phase_id), Some(depends_on_phase_id)) = (phase_id, depends_on_phase_id) else {
            return Err(PlannerError::Validation(
                "phase_id and depends_on_phase_id are required".to_string(),
            ));
        };

        let dependency_type = dependency_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEPENDENCY_TYPE.to_string());

        Ok(self.store.insert_dependency(&NewDependency {
            phase_id,
            depends_on_phase_id,
            dependency_type,
            notes,
        })?)
    }

    pub fn remove_dependency(&self, id: &DependencyId) -> Result<()> {
        if !self.store.delete_dependency(id)? {
            return Err(PlannerError::not_found("dependency", id));
        }
        Ok(())
    }

    pub fn blocked(&self) -> Result<Vec<PhaseWithDeps>> {
        Ok(self
            .store
            .list_phases_with_deps()?
            .into_iter()
            .filter(|p| p.is_blocked)
            .collect())
    }
}

use ryan_schemas::{
    Bug, CurrentFocus, DependencyDetail, DependencyId, FocusView, KnowledgeEntry, NewBug,
    NewDependency, NewFocus, NewKnowledgeEntry, NewPhase, NewProject, NewTodo, NewTradeline, Phase,
    PhaseDependency, PhaseId, PhasePatch, PhaseWithDeps, PhaseWithProject, Project, ProjectId,
    Severity, Todo, TodoId, TodoPriority, Tradeline, TradelineId, TradelinePatch, TradelineRun,
    TradelineStatus, UsageId, UsageRecord,
};

use crate::error::Result;

/// Counter columns that may be bumped in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    TradelineDiscoveryCount,
    TradelineErrorCount,
}

impl CounterField {
    pub fn table(&self) -> &'static str {
        match self {
            CounterField::TradelineDiscoveryCount | CounterField::TradelineErrorCount => {
                "tradelines"
            }
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            CounterField::TradelineDiscoveryCount => "discovery_count",
            CounterField::TradelineErrorCount => "error_count",
        }
    }

    pub fn entity(&self) -> &'static str {
        match self {
            CounterField::TradelineDiscoveryCount | CounterField::TradelineErrorCount => {
                "tradeline"
            }
        }
    }
}

/// Uniform query/mutate interface over projects, phases, dependencies,
/// focus records, todos, tradelines, bugs, roadmap artifacts and usage rows.
///
/// Every component receives the store as an injected capability, so the
/// planner can run against any implementation. Single-row writes are atomic;
/// the multi-step operations documented below run in one transaction.
pub trait Store: Send + Sync {
    // === Projects ===

    /// All projects ordered by name
    fn list_projects(&self) -> Result<Vec<Project>>;
    /// Active projects ordered by sort order
    fn list_active_projects(&self) -> Result<Vec<Project>>;
    fn get_project(&self, id: &ProjectId) -> Result<Option<Project>>;
    fn insert_project(&self, project: &NewProject) -> Result<Project>;
    fn list_project_paths(&self, project_id: &ProjectId) -> Result<Vec<String>>;
    fn add_project_path(&self, project_id: &ProjectId, path: &str) -> Result<()>;

    // === Phases ===

    /// Every phase annotated through the dependency view
    fn list_phases_with_deps(&self) -> Result<Vec<PhaseWithDeps>>;
    fn get_phase(&self, id: &PhaseId) -> Result<Option<Phase>>;
    fn list_project_phases(&self, project_id: &ProjectId) -> Result<Vec<Phase>>;
    fn insert_phase(&self, phase: &NewPhase) -> Result<Phase>;
    /// Applies the given fields and refreshes `updated_at`
    fn update_phase(&self, id: &PhaseId, patch: &PhasePatch, now: &str) -> Result<Phase>;
    /// Moves a phase to in_progress, stamping `started_at` only if unset
    fn start_phase(&self, id: &PhaseId, now: &str) -> Result<Phase>;
    /// Retires the phase's active focus records and marks it complete, in one transaction
    fn complete_phase(&self, id: &PhaseId, now: &str) -> Result<Phase>;
    fn delete_phase(&self, id: &PhaseId) -> Result<bool>;
    fn recently_completed_phases(&self, since: &str, limit: usize)
        -> Result<Vec<PhaseWithProject>>;

    // === Dependencies ===

    fn list_dependencies(&self, phase_id: &PhaseId) -> Result<Vec<DependencyDetail>>;
    /// Rejects self-dependencies before anything is written
    fn insert_dependency(&self, dependency: &NewDependency) -> Result<PhaseDependency>;
    fn delete_dependency(&self, id: &DependencyId) -> Result<bool>;

    // === Current Focus ===

    /// Active focus records ordered by priority
    fn active_focus(&self, limit: Option<usize>) -> Result<Vec<FocusView>>;
    fn insert_focus(&self, focus: &NewFocus) -> Result<CurrentFocus>;

    // === Todos ===

    fn todos_for_path(&self, project_path: &str) -> Result<Vec<Todo>>;
    fn get_todo(&self, id: &TodoId) -> Result<Option<Todo>>;
    fn insert_todo(&self, todo: &NewTodo) -> Result<Todo>;

    // === Tradelines ===

    fn list_tradelines(&self, status: Option<TradelineStatus>) -> Result<Vec<Tradeline>>;
    fn get_tradeline(&self, id: &TradelineId) -> Result<Option<Tradeline>>;
    fn insert_tradeline(&self, tradeline: &NewTradeline) -> Result<Tradeline>;
    fn update_tradeline(
        &self,
        id: &TradelineId,
        patch: &TradelinePatch,
        now: &str,
    ) -> Result<Tradeline>;
    /// Stamps the run and bumps the matching counter, in one transaction
    fn record_tradeline_run(
        &self,
        id: &TradelineId,
        run: &TradelineRun,
        now: &str,
    ) -> Result<Tradeline>;
    /// Atomic in-place counter increment
    fn increment(&self, field: CounterField, id: &str, delta: i64) -> Result<()>;

    // === Bugs ===

    /// Open or investigating bugs with one of the given severities
    fn list_active_bugs(&self, severities: &[Severity], limit: Option<usize>) -> Result<Vec<Bug>>;
    fn insert_bug(&self, bug: &NewBug) -> Result<Bug>;

    // === Roadmap artifacts ===

    /// Appends the artifact and applies every todo priority update, in one transaction.
    /// Returns the stored entry and the number of todos actually updated.
    fn record_priority_analysis(
        &self,
        entry: &NewKnowledgeEntry,
        updates: &[(TodoId, TodoPriority)],
    ) -> Result<(KnowledgeEntry, usize)>;
    /// Most recent entry by creation time
    fn latest_knowledge_entry(&self, category: &str, source: &str)
        -> Result<Option<KnowledgeEntry>>;

    // === Usage ===

    fn insert_usage(&self, record: &UsageRecord) -> Result<UsageId>;
    fn recent_usage(&self, limit: usize) -> Result<Vec<UsageRecord>>;
}

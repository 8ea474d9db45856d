//! Test doubles shared by the planner's unit tests

use async_trait::async_trait;
use ryan_schemas::*;
use ryan_store::{CounterField, Database, Result, Store, StoreError};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::gateway::{Generation, GenerationRequest, ModelError, TextGenerator};

/// Replays canned responses in order; `None` (or running out) is an empty response
pub struct ScriptedGenerator {
    model: String,
    responses: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(model: &str, responses: Vec<Option<String>>) -> Self {
        Self {
            model: model.to_string(),
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<Generation, ModelError> {
        self.requests.lock().unwrap().push(request.clone());

        match self.responses.lock().unwrap().pop_front().flatten() {
            Some(content) => Ok(Generation {
                content,
                model: self.model.clone(),
                input_tokens: 1200,
                output_tokens: 400,
            }),
            None => Err(ModelError::EmptyResponse("scripted")),
        }
    }
}

/// In-memory database that can be told to fail selected operations
pub struct FlakyStore {
    pub inner: Database,
    fail_usage: bool,
    fail_knowledge: bool,
    fail_todos: bool,
}

impl FlakyStore {
    fn with(fail_usage: bool, fail_knowledge: bool, fail_todos: bool) -> Self {
        Self {
            inner: Database::open_in_memory().unwrap(),
            fail_usage,
            fail_knowledge,
            fail_todos,
        }
    }

    pub fn failing_usage() -> Self {
        Self::with(true, false, false)
    }

    pub fn failing_knowledge() -> Self {
        Self::with(false, true, false)
    }

    pub fn failing_todos() -> Self {
        Self::with(false, false, true)
    }
}

fn injected<T>() -> Result<T> {
    Err(StoreError::LockPoisoned)
}

impl Store for FlakyStore {
    fn list_projects(&self) -> Result<Vec<Project>> {
        self.inner.list_projects()
    }
    fn list_active_projects(&self) -> Result<Vec<Project>> {
        self.inner.list_active_projects()
    }
    fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        self.inner.get_project(id)
    }
    fn insert_project(&self, project: &NewProject) -> Result<Project> {
        self.inner.insert_project(project)
    }
    fn list_project_paths(&self, project_id: &ProjectId) -> Result<Vec<String>> {
        self.inner.list_project_paths(project_id)
    }
    fn add_project_path(&self, project_id: &ProjectId, path: &str) -> Result<()> {
        self.inner.add_project_path(project_id, path)
    }
    fn list_phases_with_deps(&self) -> Result<Vec<PhaseWithDeps>> {
        self.inner.list_phases_with_deps()
    }
    fn get_phase(&self, id: &PhaseId) -> Result<Option<Phase>> {
        self.inner.get_phase(id)
    }
    fn list_project_phases(&self, project_id: &ProjectId) -> Result<Vec<Phase>> {
        self.inner.list_project_phases(project_id)
    }
    fn insert_phase(&self, phase: &NewPhase) -> Result<Phase> {
        self.inner.insert_phase(phase)
    }
    fn update_phase(&self, id: &PhaseId, patch: &PhasePatch, now: &str) -> Result<Phase> {
        self.inner.update_phase(id, patch, now)
    }
    fn start_phase(&self, id: &PhaseId, now: &str) -> Result<Phase> {
        self.inner.start_phase(id, now)
    }
    fn complete_phase(&self, id: &PhaseId, now: &str) -> Result<Phase> {
        self.inner.complete_phase(id, now)
    }
    fn delete_phase(&self, id: &PhaseId) -> Result<bool> {
        self.inner.delete_phase(id)
    }
    fn recently_completed_phases(
        &self,
        since: &str,
        limit: usize,
    ) -> Result<Vec<PhaseWithProject>> {
        self.inner.recently_completed_phases(since, limit)
    }
    fn list_dependencies(&self, phase_id: &PhaseId) -> Result<Vec<DependencyDetail>> {
        self.inner.list_dependencies(phase_id)
    }
    fn insert_dependency(&self, dependency: &NewDependency) -> Result<PhaseDependency> {
        self.inner.insert_dependency(dependency)
    }
    fn delete_dependency(&self, id: &DependencyId) -> Result<bool> {
        self.inner.delete_dependency(id)
    }
    fn active_focus(&self, limit: Option<usize>) -> Result<Vec<FocusView>> {
        self.inner.active_focus(limit)
    }
    fn insert_focus(&self, focus: &NewFocus) -> Result<CurrentFocus> {
        self.inner.insert_focus(focus)
    }
    fn todos_for_path(&self, project_path: &str) -> Result<Vec<Todo>> {
        if self.fail_todos {
            return injected();
        }
        self.inner.todos_for_path(project_path)
    }
    fn get_todo(&self, id: &TodoId) -> Result<Option<Todo>> {
        self.inner.get_todo(id)
    }
    fn insert_todo(&self, todo: &NewTodo) -> Result<Todo> {
        self.inner.insert_todo(todo)
    }
    fn list_tradelines(&self, status: Option<TradelineStatus>) -> Result<Vec<Tradeline>> {
        self.inner.list_tradelines(status)
    }
    fn get_tradeline(&self, id: &TradelineId) -> Result<Option<Tradeline>> {
        self.inner.get_tradeline(id)
    }
    fn insert_tradeline(&self, tradeline: &NewTradeline) -> Result<Tradeline> {
        self.inner.insert_tradeline(tradeline)
    }
    fn update_tradeline(
        &self,
        id: &TradelineId,
        patch: &TradelinePatch,
        now: &str,
    ) -> Result<Tradeline> {
        self.inner.update_tradeline(id, patch, now)
    }
    fn record_tradeline_run(
        &self,
        id: &TradelineId,
        run: &TradelineRun,
        now: &str,
    ) -> Result<Tradeline> {
        self.inner.record_tradeline_run(id, run, now)
    }
    fn increment(&self, field: CounterField, id: &str, delta: i64) -> Result<()> {
        self.inner.increment(field, id, delta)
    }
    fn list_active_bugs(&self, severities: &[Severity], limit: Option<usize>) -> Result<Vec<Bug>> {
        self.inner.list_active_bugs(severities, limit)
    }
    fn insert_bug(&self, bug: &NewBug) -> Result<Bug> {
        self.inner.insert_bug(bug)
    }
    fn record_priority_analysis(
        &self,
        entry: &NewKnowledgeEntry,
        updates: &[(TodoId, TodoPriority)],
    ) -> Result<(KnowledgeEntry, usize)> {
        self.inner.record_priority_analysis(entry, updates)
    }
    fn latest_knowledge_entry(
        &self,
        category: &str,
        source: &str,
    ) -> Result<Option<KnowledgeEntry>> {
        if self.fail_knowledge {
            return injected();
        }
        self.inner.latest_knowledge_entry(category, source)
    }
    fn insert_usage(&self, record: &UsageRecord) -> Result<UsageId> {
        if self.fail_usage {
            return injected();
        }
        self.inner.insert_usage(record)
    }
    fn recent_usage(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        self.inner.recent_usage(limit)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn project(store: &dyn Store, name: &str, slug: &str) -> Project {
    store.insert_project(&NewProject::new(name, slug)).unwrap()
}

pub fn phase(
    store: &dyn Store,
    project: &Project,
    name: &str,
    status: PhaseStatus,
    sort_order: i64,
) -> Phase {
    store
        .insert_phase(&NewPhase {
            project_id: project.id.clone(),
            name: name.to_string(),
            description: Some(format!("{} work", name)),
            status,
            sort_order,
        })
        .unwrap()
}

pub fn block(store: &dyn Store, waiting: &Phase, on: &Phase) {
    store
        .insert_dependency(&NewDependency {
            phase_id: waiting.id.clone(),
            depends_on_phase_id: on.id.clone(),
            dependency_type: DEFAULT_DEPENDENCY_TYPE.to_string(),
            notes: None,
        })
        .unwrap();
}

pub fn todo(store: &dyn Store, path: &str, title: &str, priority: Option<&str>) -> Todo {
    store
        .insert_todo(&NewTodo {
            project_path: path.to_string(),
            title: title.to_string(),
            description: None,
            priority: priority.map(str::to_string),
            status: "pending".to_string(),
            category: None,
        })
        .unwrap()
}

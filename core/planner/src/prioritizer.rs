//! Cross-project prioritization.
//!
//! Gathers actionable todos from every project, asks the general model for a
//! unified roadmap, validates the answer and writes it back: the analysis as
//! an append-only knowledge entry and the re-bucketed priorities onto the
//! todos themselves. The store write is a single transaction.

use chrono::Utc;
use ryan_schemas::{
    CrossProjectAnalysis, CrossProjectBlocker, CrossProjectDependency, KnowledgeId,
    NewKnowledgeEntry, ProjectTodo, RoadmapPhase, TodoId, TodoPriority,
};
use ryan_store::Store;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{PlannerError, Result};
use crate::gateway::{GenerationRequest, ModelGateway};

pub const ROADMAP_CATEGORY: &str = "Roadmap";
pub const ROADMAP_SOURCE: &str = "ryan_prioritizer";
pub const TASK_TYPE: &str = "cross_project_prioritization";
pub const ANALYSIS_MAX_TOKENS: u32 = 3000;
pub const DEFAULT_ARTIFACT_PATH: &str = "/var/www/Studio/ai-team";

const MIN_SCORE: f64 = 1.0;
const MAX_SCORE: f64 = 100.0;

const CROSS_PROJECT_SYSTEM: &str = r#"You are a project prioritization expert analyzing todos across multiple related projects.

RULES:
1. Output ONLY valid JSON - no explanations
2. Look for DEPENDENCIES between projects (shared components, APIs, data flows)
3. Identify BLOCKERS that affect multiple projects
4. Assign global priority scores (1-100) based on impact and urgency
5. Group into cross-project phases

OUTPUT SCHEMA:
{
  "unified_roadmap": [
    {
      "phase": "Phase 1",
      "theme": "Brief description of this phase's focus",
      "items": [
        {
          "project": "project_slug of the todo",
          "todo_id": "todo id",
          "title": "todo title",
          "priority_score": 95,
          "reason": "Why this priority"
        }
      ]
    }
  ],
  "blockers": [
    {
      "blocker_todo_id": "todo id",
      "blocker_project": "project_slug of the blocking todo",
      "blocks": ["project_slug of each blocked project"],
      "description": "What it blocks and why"
    }
  ],
  "dependencies": [
    {
      "from_project": "project_slug",
      "from_todo_id": "todo id",
      "to_project": "project_slug",
      "to_todo_id": "todo id",
      "relationship": "requires|enables|shares"
    }
  ]
}"#;

#[derive(Debug, Clone)]
pub struct PrioritizerConfig {
    /// Project path the roadmap artifacts are filed under
    pub artifact_project_path: String,
}

impl Default for PrioritizerConfig {
    fn default() -> Self {
        Self {
            artifact_project_path: DEFAULT_ARTIFACT_PATH.to_string(),
        }
    }
}

/// What the model sees for each todo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodoSummary {
    pub id: TodoId,
    pub project: String,
    /// Identifier the model must use when naming projects
    pub project_slug: String,
    pub title: String,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub base_score: u32,
}

pub fn summarize(todos: &[ProjectTodo]) -> Vec<TodoSummary> {
    todos
        .iter()
        .map(|t| TodoSummary {
            id: t.todo.id.clone(),
            project: t.project_name.clone(),
            project_slug: t.project_slug.clone(),
            title: t.todo.title.clone(),
            category: t.todo.category.clone(),
            priority: t.todo.priority.clone(),
            base_score: TodoPriority::base_score(t.todo.priority.as_deref()),
        })
        .collect()
}

pub fn build_prompt(summaries: &[TodoSummary]) -> Result<String> {
    let listing = serde_json::to_string_pretty(summaries)?;

    Ok(format!(
        r#"Analyze these {} todos from multiple projects and create a unified priority roadmap:

{}

Look for:
1. Cross-project dependencies (shared APIs, components, data)
2. Blockers that affect multiple projects
3. Natural groupings into phases
4. Priority based on impact and dependencies

Output ONLY valid JSON matching the schema."#,
        summaries.len(),
        listing
    ))
}

/// Parses the model output. Anything that is not a well-formed analysis
/// document fails the run.
pub fn parse_analysis(content: &str) -> Result<CrossProjectAnalysis> {
    let mut analysis: CrossProjectAnalysis =
        serde_json::from_str(content.trim()).map_err(|e| {
            error!("AI returned invalid JSON: {}", e);
            PlannerError::InvalidAnalysis(e.to_string())
        })?;

    for item in analysis
        .unified_roadmap
        .iter_mut()
        .flat_map(|phase| phase.items.iter_mut())
    {
        if let Some(score) = item.priority_score {
            let clamped = score.clamp(MIN_SCORE, MAX_SCORE);
            if clamped != score {
                warn!(
                    "Clamped priority score {} to {} for '{}'",
                    score, clamped, item.title
                );
                item.priority_score = Some(clamped);
            }
        }
    }

    for dependency in &analysis.dependencies {
        if dependency.relationship_kind().is_none() {
            warn!(
                "Unrecognized relationship '{}' between {} and {}",
                dependency.relationship, dependency.from_project, dependency.to_project
            );
        }
    }

    Ok(analysis)
}

#[derive(Debug, Clone, Serialize)]
pub struct PrioritizationReport {
    pub todo_count: usize,
    /// Number of roadmap phases
    pub phases: usize,
    pub blockers: Vec<CrossProjectBlocker>,
    pub dependencies: Vec<CrossProjectDependency>,
    pub roadmap: Vec<RoadmapPhase>,
    pub priorities_updated: usize,
    pub artifact_id: KnowledgeId,
}

#[derive(Debug, Clone)]
pub enum PrioritizationOutcome {
    /// Nothing actionable anywhere; no model call and nothing persisted
    NoTodos,
    Completed(PrioritizationReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorityStatus {
    pub total_todos: usize,
    pub by_priority: PriorityCounts,
    pub by_project: BTreeMap<String, usize>,
    pub projects: usize,
}

pub struct Prioritizer {
    store: Arc<dyn Store>,
    gateway: Arc<ModelGateway>,
    config: PrioritizerConfig,
}

impl Prioritizer {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<ModelGateway>,
        config: PrioritizerConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    /// Every actionable todo, tagged with the project that owns its path
    pub fn gather(&self) -> Result<Vec<ProjectTodo>> {
        let projects = self.store.list_projects()?;
        let mut gathered = Vec::new();

        for project in &projects {
            for path in self.store.list_project_paths(&project.id)? {
                for todo in self.store.todos_for_path(&path)? {
                    if !todo.is_actionable() {
                        continue;
                    }
                    gathered.push(ProjectTodo {
                        project_id: project.id.clone(),
                        project_name: project.name.clone(),
                        project_slug: project.slug.clone(),
                        is_parent: project.is_parent,
                        parent_id: project.parent_id.clone(),
                        todo,
                    });
                }
            }
        }

        info!(
            "Gathered {} todos from {} projects",
            gathered.len(),
            projects.len()
        );
        Ok(gathered)
    }

    /// Asks the general model for the cross-project view. An empty set
    /// short-circuits to an empty analysis.
    pub async fn analyze(&self, todos: &[ProjectTodo]) -> Result<CrossProjectAnalysis> {
        if todos.is_empty() {
            info!("No todos to analyze");
            return Ok(CrossProjectAnalysis::default());
        }

        let prompt = build_prompt(&summarize(todos))?;
        let request = GenerationRequest::new(prompt)
            .with_system(CROSS_PROJECT_SYSTEM)
            .with_max_tokens(ANALYSIS_MAX_TOKENS)
            .json()
            .with_task_type(TASK_TYPE);

        let generation = self.gateway.generate_general(&request).await?;
        parse_analysis(&generation.content)
    }

    /// Appends the artifact and applies the re-bucketed priorities together
    pub fn persist(&self, analysis: &CrossProjectAnalysis) -> Result<(KnowledgeId, usize)> {
        let entry = NewKnowledgeEntry {
            project_path: self.config.artifact_project_path.clone(),
            title: format!(
                "Cross-Project Priority Analysis - {}",
                Utc::now().format("%Y-%m-%d")
            ),
            content: serde_json::to_string_pretty(analysis)?,
            category: ROADMAP_CATEGORY.to_string(),
            source: ROADMAP_SOURCE.to_string(),
        };

        let updates = analysis.priority_updates();
        let (stored, updated) = self.store.record_priority_analysis(&entry, &updates)?;

        if updated < updates.len() {
            debug!(
                "{} roadmap item(s) named todos that no longer exist",
                updates.len() - updated
            );
        }
        Ok((stored.id, updated))
    }

    pub async fn prioritize_all(&self) -> Result<PrioritizationOutcome> {
        info!("Starting cross-project prioritization");

        let todos = self.gather()?;
        if todos.is_empty() {
            info!("No todos found across projects");
            return Ok(PrioritizationOutcome::NoTodos);
        }

        let analysis = self.analyze(&todos).await.map_err(|e| {
            error!("Prioritization failed: {}", e);
            e
        })?;
        let (artifact_id, priorities_updated) = self.persist(&analysis)?;

        info!(
            "Cross-project prioritization complete: {} phases, {} blockers, {} dependencies",
            analysis.unified_roadmap.len(),
            analysis.blockers.len(),
            analysis.dependencies.len()
        );

        Ok(PrioritizationOutcome::Completed(PrioritizationReport {
            todo_count: todos.len(),
            phases: analysis.unified_roadmap.len(),
            blockers: analysis.blockers,
            dependencies: analysis.dependencies,
            roadmap: analysis.unified_roadmap,
            priorities_updated,
            artifact_id,
        }))
    }

    /// Fresh counts of actionable todos; missing or unknown priorities count as medium
    pub fn status(&self) -> Result<PriorityStatus> {
        let todos = self.gather()?;

        let mut by_priority = PriorityCounts::default();
        let mut by_project: BTreeMap<String, usize> = BTreeMap::new();

        for item in &todos {
            match item.todo.priority_level().unwrap_or(TodoPriority::Medium) {
                TodoPriority::Critical => by_priority.critical += 1,
                TodoPriority::High => by_priority.high += 1,
                TodoPriority::Medium => by_priority.medium += 1,
                TodoPriority::Low => by_priority.low += 1,
            }
            *by_project.entry(item.project_name.clone()).or_default() += 1;
        }

        Ok(PriorityStatus {
            total_todos: todos.len(),
            projects: by_project.len(),
            by_priority,
            by_project,
        })
    }

    /// Blockers from the latest roadmap that involve the project. Advisory:
    /// any failure yields an empty list.
    pub fn blockers_for_project(&self, project_slug: &str) -> Vec<CrossProjectBlocker> {
        let entry = match self
            .store
            .latest_knowledge_entry(ROADMAP_CATEGORY, ROADMAP_SOURCE)
        {
            Ok(Some(entry)) => entry,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to load latest roadmap: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<CrossProjectAnalysis>(&entry.content) {
            Ok(analysis) => analysis.blockers_affecting(project_slug),
            Err(e) => {
                warn!("Stored roadmap {} is not a valid analysis: {}", entry.id, e);
                Vec::new()
            }
        }
    }
}

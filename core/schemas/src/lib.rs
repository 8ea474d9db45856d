use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// ULID and ID Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FocusId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TodoId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradelineId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BugId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnowledgeId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageId(pub String);

macro_rules! display_id {
    ($($name:ident),* $(,)?) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<&str> for $name {
                fn from(raw: &str) -> Self {
                    Self(raw.to_string())
                }
            }
        )*
    };
}

display_id!(
    ProjectId,
    PhaseId,
    DependencyId,
    FocusId,
    TodoId,
    TradelineId,
    BugId,
    KnowledgeId,
    UsageId,
);

/// Raised when a stored or submitted label does not match a known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// ============================================================================
// Status Enums
// ============================================================================

/// Stored lifecycle of a phase. `blocked` is derived from the dependency
/// graph and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Complete,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::InProgress => "in_progress",
            PhaseStatus::Complete => "complete",
        }
    }

    /// Pending and in-progress phases can still be worked on
    pub fn is_open(&self) -> bool {
        matches!(self, PhaseStatus::Pending | PhaseStatus::InProgress)
    }
}

impl FromStr for PhaseStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PhaseStatus::Pending),
            "in_progress" => Ok(PhaseStatus::InProgress),
            "complete" => Ok(PhaseStatus::Complete),
            other => Err(UnknownVariant {
                kind: "phase status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradelineStatus {
    Pending,
    Development,
    Testing,
    Live,
}

impl TradelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradelineStatus::Pending => "pending",
            TradelineStatus::Development => "development",
            TradelineStatus::Testing => "testing",
            TradelineStatus::Live => "live",
        }
    }
}

impl FromStr for TradelineStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TradelineStatus::Pending),
            "development" => Ok(TradelineStatus::Development),
            "testing" => Ok(TradelineStatus::Testing),
            "live" => Ok(TradelineStatus::Live),
            other => Err(UnknownVariant {
                kind: "tradeline status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl FromStr for Severity {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(UnknownVariant {
                kind: "severity",
                value: other.to_string(),
            }),
        }
    }
}

/// Bug statuses that still need attention
pub const ACTIVE_BUG_STATUSES: [&str; 2] = ["open", "investigating"];

/// Four-level todo priority. Stored todos keep the raw label, so parsing is
/// case-insensitive and tolerant of missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl TodoPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoPriority::Critical => "critical",
            TodoPriority::High => "high",
            TodoPriority::Medium => "medium",
            TodoPriority::Low => "low",
        }
    }

    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "critical" => Some(TodoPriority::Critical),
            "high" => Some(TodoPriority::High),
            "medium" => Some(TodoPriority::Medium),
            "low" => Some(TodoPriority::Low),
            _ => None,
        }
    }

    /// Fixed weight used when summarizing todos for cross-project analysis
    pub fn weight(&self) -> u32 {
        match self {
            TodoPriority::Critical => 100,
            TodoPriority::High => 75,
            TodoPriority::Medium => 50,
            TodoPriority::Low => 25,
        }
    }

    /// Base score of a raw priority label; unknown or missing labels weigh as medium
    pub fn base_score(raw: Option<&str>) -> u32 {
        raw.and_then(Self::parse_loose)
            .unwrap_or(TodoPriority::Medium)
            .weight()
    }

    /// Compress a 1-100 global score back onto the four-level scale.
    /// Never yields `Critical`.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            TodoPriority::High
        } else if score >= 50.0 {
            TodoPriority::Medium
        } else {
            TodoPriority::Low
        }
    }
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<ProjectId>,
    pub client_id: Option<String>,
    pub is_parent: bool,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_at: String, // RFC3339
    pub updated_at: String, // RFC3339
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub slug: String,
    pub parent_id: Option<ProjectId>,
    pub client_id: Option<String>,
    pub is_parent: bool,
    pub is_active: bool,
    pub sort_order: i64,
}

impl NewProject {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            parent_id: None,
            client_id: None,
            is_parent: false,
            is_active: true,
            sort_order: 0,
        }
    }
}

// ============================================================================
// Phases and Dependencies
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub status: PhaseStatus,
    pub sort_order: i64,
    pub started_at: Option<String>,   // RFC3339
    pub completed_at: Option<String>, // RFC3339
    pub created_at: String,           // RFC3339
    pub updated_at: String,           // RFC3339
}

/// A phase as seen through the dependency view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseWithDeps {
    #[serde(flatten)]
    pub phase: Phase,
    pub project_name: String,
    pub project_slug: String,
    pub is_blocked: bool,
    pub blocking_deps_count: usize,
    /// Unfinished phases this one is waiting on
    pub blocking_phase_ids: Vec<PhaseId>,
}

impl PhaseWithDeps {
    /// True if this phase is not blocked and can still be worked on
    pub fn is_actionable(&self) -> bool {
        self.phase.status.is_open() && !self.is_blocked
    }

    pub fn is_waiting_on(&self, blocker: &PhaseId) -> bool {
        self.is_blocked && self.blocking_phase_ids.contains(blocker)
    }
}

/// A phase joined with the project it belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseWithProject {
    #[serde(flatten)]
    pub phase: Phase,
    pub project_name: String,
    pub project_slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPhase {
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub status: PhaseStatus,
    pub sort_order: i64,
}

/// Partial update of a phase; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhasePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<PhaseStatus>,
    pub sort_order: Option<i64>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

pub const DEFAULT_DEPENDENCY_TYPE: &str = "blocks";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDependency {
    pub id: DependencyId,
    pub phase_id: PhaseId,
    pub depends_on_phase_id: PhaseId,
    pub dependency_type: String,
    pub notes: Option<String>,
    pub created_at: String, // RFC3339
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyTarget {
    pub id: PhaseId,
    pub name: String,
    pub status: PhaseStatus,
    pub project_name: String,
    pub project_slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyDetail {
    #[serde(flatten)]
    pub dependency: PhaseDependency,
    pub depends_on: DependencyTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDependency {
    pub phase_id: PhaseId,
    pub depends_on_phase_id: PhaseId,
    pub dependency_type: String,
    pub notes: Option<String>,
}

impl NewDependency {
    pub fn is_self_loop(&self) -> bool {
        self.phase_id == self.depends_on_phase_id
    }
}

// ============================================================================
// Current Focus
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentFocus {
    pub id: FocusId,
    pub project_id: ProjectId,
    pub phase_id: PhaseId,
    pub priority: i64,
    pub rationale: Option<String>,
    pub set_by: String,
    pub created_at: String,           // RFC3339
    pub completed_at: Option<String>, // RFC3339, null while active
}

impl CurrentFocus {
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }
}

/// Focus record joined with its project and phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusView {
    #[serde(flatten)]
    pub focus: CurrentFocus,
    pub project_name: String,
    pub project_slug: String,
    pub phase_name: String,
    pub phase_description: Option<String>,
    pub phase_status: PhaseStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFocus {
    pub project_id: ProjectId,
    pub phase_id: PhaseId,
    pub priority: i64,
    pub rationale: String,
    pub set_by: String,
}

// ============================================================================
// Todos
// ============================================================================

pub const TODO_STATUS_COMPLETED: &str = "completed";

/// Categories that take a todo out of the actionable set
pub const NON_ACTIONABLE_CATEGORIES: [&str; 2] = ["moved_to_knowledge", "duplicate"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub project_path: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: String,
    pub category: Option<String>,
    pub created_at: String, // RFC3339
    pub updated_at: String, // RFC3339
}

impl Todo {
    pub fn is_actionable(&self) -> bool {
        if self.status == TODO_STATUS_COMPLETED {
            return false;
        }
        match self.category.as_deref() {
            Some(category) => !NON_ACTIONABLE_CATEGORIES.contains(&category),
            None => true,
        }
    }

    pub fn priority_level(&self) -> Option<TodoPriority> {
        self.priority.as_deref().and_then(TodoPriority::parse_loose)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTodo {
    pub project_path: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: String,
    pub category: Option<String>,
}

/// Todo tagged with the project that owns its path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectTodo {
    pub project_id: ProjectId,
    pub project_name: String,
    pub project_slug: String,
    pub is_parent: bool,
    pub parent_id: Option<ProjectId>,
    #[serde(flatten)]
    pub todo: Todo,
}

// ============================================================================
// Tradelines and Bugs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tradeline {
    pub id: TradelineId,
    pub name: String,
    pub slug: String,
    pub status: TradelineStatus,
    pub port_number: Option<i64>,
    pub server_path: Option<String>,
    pub droplet_ip: Option<String>,
    pub notes: Option<String>,
    pub discovery_count: i64,
    pub error_count: i64,
    pub last_run_at: Option<String>,     // RFC3339
    pub last_success_at: Option<String>, // RFC3339
    pub last_error: Option<String>,
    pub created_at: String, // RFC3339
    pub updated_at: String, // RFC3339
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTradeline {
    pub name: String,
    pub slug: String,
    pub status: TradelineStatus,
    pub port_number: Option<i64>,
    pub server_path: Option<String>,
    pub droplet_ip: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradelinePatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub status: Option<TradelineStatus>,
    pub port_number: Option<i64>,
    pub server_path: Option<String>,
    pub droplet_ip: Option<String>,
    pub notes: Option<String>,
    pub last_success_at: Option<String>,
}

/// Outcome of one run of a tradeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradelineRun {
    pub discoveries: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bug {
    pub id: BugId,
    pub title: String,
    pub severity: Severity,
    pub status: String,
    pub project_path: Option<String>,
    pub created_at: String, // RFC3339
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBug {
    pub title: String,
    pub severity: Severity,
    pub status: String,
    pub project_path: Option<String>,
}

// ============================================================================
// Knowledge Entries and Usage Records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: KnowledgeId,
    pub project_path: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub source: String,
    pub created_at: String, // RFC3339
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewKnowledgeEntry {
    pub project_path: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub source: String,
}

/// One model invocation, as written to the audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_usd: f64,
    pub task_type: Option<String>,
    pub assistant_name: String,
    pub prompt_preview: Option<String>,
}

// ============================================================================
// Cross-Project Analysis Document
// ============================================================================

/// Structured result of one cross-project prioritization run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossProjectAnalysis {
    #[serde(default)]
    pub unified_roadmap: Vec<RoadmapPhase>,
    #[serde(default)]
    pub blockers: Vec<CrossProjectBlocker>,
    #[serde(default)]
    pub dependencies: Vec<CrossProjectDependency>,
}

impl CrossProjectAnalysis {
    pub fn is_empty(&self) -> bool {
        self.unified_roadmap.is_empty() && self.blockers.is_empty() && self.dependencies.is_empty()
    }

    /// Re-bucketed priority for every roadmap item that names a todo and a score
    pub fn priority_updates(&self) -> Vec<(TodoId, TodoPriority)> {
        self.unified_roadmap
            .iter()
            .flat_map(|phase| phase.items.iter())
            .filter_map(|item| match (&item.todo_id, item.priority_score) {
                (Some(todo_id), Some(score)) => {
                    Some((todo_id.clone(), TodoPriority::from_score(score)))
                }
                _ => None,
            })
            .collect()
    }

    pub fn blockers_affecting(&self, project_slug: &str) -> Vec<CrossProjectBlocker> {
        self.blockers
            .iter()
            .filter(|blocker| blocker.affects(project_slug))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapPhase {
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub items: Vec<RoadmapItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapItem {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub todo_id: Option<TodoId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub priority_score: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossProjectBlocker {
    #[serde(default)]
    pub blocker_todo_id: Option<TodoId>,
    #[serde(default)]
    pub blocker_project: String,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl CrossProjectBlocker {
    pub fn affects(&self, project_slug: &str) -> bool {
        self.blocker_project == project_slug || self.blocks.iter().any(|p| p == project_slug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyRelationship {
    Requires,
    Enables,
    Shares,
}

impl FromStr for DependencyRelationship {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "requires" => Ok(DependencyRelationship::Requires),
            "enables" => Ok(DependencyRelationship::Enables),
            "shares" => Ok(DependencyRelationship::Shares),
            _ => Err(UnknownVariant {
                kind: "relationship",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossProjectDependency {
    #[serde(default)]
    pub from_project: String,
    #[serde(default)]
    pub from_todo_id: Option<TodoId>,
    #[serde(default)]
    pub to_project: String,
    #[serde(default)]
    pub to_todo_id: Option<TodoId>,
    /// Kept as the model wrote it; see `relationship_kind`
    #[serde(default)]
    pub relationship: String,
}

impl CrossProjectDependency {
    pub fn relationship_kind(&self) -> Option<DependencyRelationship> {
        self.relationship.parse().ok()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

pub fn generate_project_id() -> ProjectId {
    ProjectId(format!("proj_{}", ulid::Ulid::new()))
}

pub fn generate_phase_id() -> PhaseId {
    PhaseId(format!("phase_{}", ulid::Ulid::new()))
}

pub fn generate_dependency_id() -> DependencyId {
    DependencyId(format!("dep_{}", ulid::Ulid::new()))
}

pub fn generate_focus_id() -> FocusId {
    FocusId(format!("focus_{}", ulid::Ulid::new()))
}

pub fn generate_todo_id() -> TodoId {
    TodoId(format!("todo_{}", ulid::Ulid::new()))
}

pub fn generate_tradeline_id() -> TradelineId {
    TradelineId(format!("tl_{}", ulid::Ulid::new()))
}

pub fn generate_bug_id() -> BugId {
    BugId(format!("bug_{}", ulid::Ulid::new()))
}

pub fn generate_knowledge_id() -> KnowledgeId {
    KnowledgeId(format!("know_{}", ulid::Ulid::new()))
}

pub fn generate_usage_id() -> UsageId {
    UsageId(format!("use_{}", ulid::Ulid::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo(status: &str, category: Option<&str>, priority: Option<&str>) -> Todo {
        Todo {
            id: generate_todo_id(),
            project_path: "/srv/portal".to_string(),
            title: "Wire up login".to_string(),
            description: None,
            priority: priority.map(str::to_string),
            status: status.to_string(),
            category: category.map(str::to_string),
            created_at: "2025-01-01T00:00:00+00:00".to_string(),
            updated_at: "2025-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_id_generation() {
        let project_id = generate_project_id();
        assert!(project_id.0.starts_with("proj_"));
        assert_eq!(project_id.0.len(), 31); // "proj_" + 26 chars

        assert!(generate_phase_id().0.starts_with("phase_"));
        assert!(generate_todo_id().0.starts_with("todo_"));
        assert!(generate_tradeline_id().0.starts_with("tl_"));
        assert_ne!(generate_focus_id(), generate_focus_id());
    }

    #[test]
    fn test_status_round_trip_labels() {
        for status in [PhaseStatus::Pending, PhaseStatus::InProgress, PhaseStatus::Complete] {
            assert_eq!(status.as_str().parse::<PhaseStatus>().unwrap(), status);
        }
        assert!("blocked".parse::<PhaseStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&PhaseStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_base_score_lookup() {
        assert_eq!(TodoPriority::base_score(Some("critical")), 100);
        assert_eq!(TodoPriority::base_score(Some("HIGH")), 75);
        assert_eq!(TodoPriority::base_score(Some("Medium")), 50);
        assert_eq!(TodoPriority::base_score(Some("low")), 25);
        assert_eq!(TodoPriority::base_score(Some("someday")), 50);
        assert_eq!(TodoPriority::base_score(None), 50);
    }

    #[test]
    fn test_rebucket_boundaries() {
        assert_eq!(TodoPriority::from_score(100.0), TodoPriority::High);
        assert_eq!(TodoPriority::from_score(80.0), TodoPriority::High);
        assert_eq!(TodoPriority::from_score(79.0), TodoPriority::Medium);
        assert_eq!(TodoPriority::from_score(50.0), TodoPriority::Medium);
        assert_eq!(TodoPriority::from_score(49.0), TodoPriority::Low);
        assert_eq!(TodoPriority::from_score(1.0), TodoPriority::Low);
    }

    #[test]
    fn test_actionable_todos() {
        assert!(todo("pending", None, Some("high")).is_actionable());
        assert!(todo("in_progress", Some("feature"), None).is_actionable());
        assert!(!todo("completed", None, None).is_actionable());
        assert!(!todo("pending", Some("moved_to_knowledge"), None).is_actionable());
        assert!(!todo("pending", Some("duplicate"), None).is_actionable());
    }

    #[test]
    fn test_analysis_tolerates_missing_sections() {
        let analysis: CrossProjectAnalysis = serde_json::from_str(
            r#"{"unified_roadmap": [{"phase": "Phase 1", "items": [
                {"project": "portal", "todo_id": "todo_a", "title": "Auth", "priority_score": 91},
                {"project": "engine", "title": "Untracked", "priority_score": 40},
                {"project": "engine", "todo_id": "todo_b", "title": "No score"}
            ]}]}"#,
        )
        .unwrap();

        assert!(analysis.blockers.is_empty());
        assert!(analysis.dependencies.is_empty());
        assert_eq!(analysis.unified_roadmap[0].theme, "");

        let updates = analysis.priority_updates();
        assert_eq!(updates, vec![(TodoId::from("todo_a"), TodoPriority::High)]);
    }

    #[test]
    fn test_blocker_matching() {
        let blocker = CrossProjectBlocker {
            blocker_todo_id: Some(TodoId::from("todo_api")),
            blocker_project: "core".to_string(),
            blocks: vec!["portal".to_string(), "engine".to_string()],
            description: "Shared auth API".to_string(),
        };

        assert!(blocker.affects("core"));
        assert!(blocker.affects("portal"));
        assert!(!blocker.affects("port"));
        assert!(!blocker.affects("sources"));
    }

    #[test]
    fn test_relationship_kind() {
        let dep = CrossProjectDependency {
            from_project: "portal".into(),
            from_todo_id: None,
            to_project: "core".into(),
            to_todo_id: None,
            relationship: "Requires".into(),
        };
        assert_eq!(dep.relationship_kind(), Some(DependencyRelationship::Requires));

        let odd = CrossProjectDependency {
            relationship: "requires|enables".into(),
            ..dep
        };
        assert_eq!(odd.relationship_kind(), None);
    }
}

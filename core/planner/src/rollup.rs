use ryan_schemas::{
    Bug, FocusView, PhaseStatus, PhaseWithDeps, Project, Severity, Tradeline, TradelineStatus,
};
use ryan_store::Store;
use serde::Serialize;
use std::sync::Arc;

use crate::error::Result;

const ALL_SEVERITIES: [Severity; 4] = [
    Severity::Critical,
    Severity::High,
    Severity::Medium,
    Severity::Low,
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStats {
    pub total_phases: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub open_bugs: usize,
    pub critical_bugs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRollup {
    #[serde(flatten)]
    pub project: Project,
    pub phases: Vec<PhaseWithDeps>,
    pub stats: ProjectStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollupSummary {
    pub total_projects: usize,
    /// Projects with at least one in-progress phase
    pub active_projects: usize,
    pub total_phases: usize,
    pub completed_phases: usize,
    pub blocked_phases: usize,
    pub live_tradelines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusRollup {
    pub projects: Vec<ProjectRollup>,
    pub tradelines: Vec<Tradeline>,
    pub current_focus: Vec<FocusView>,
    pub summary: RollupSummary,
}

/// Bugs are attributed to a project when their path mentions its slug
fn bugs_for<'a>(bugs: &'a [Bug], slug: &'a str) -> impl Iterator<Item = &'a Bug> {
    bugs.iter().filter(move |bug| {
        bug.project_path
            .as_deref()
            .is_some_and(|path| path.contains(slug))
    })
}

fn project_rollup(project: Project, phases: &[PhaseWithDeps], bugs: &[Bug]) -> ProjectRollup {
    let phases: Vec<PhaseWithDeps> = phases
        .iter()
        .filter(|p| p.phase.project_id == project.id)
        .cloned()
        .collect();

    let mut stats = ProjectStats {
        total_phases: phases.len(),
        ..ProjectStats::default()
    };
    for phase in &phases {
        match phase.phase.status {
            PhaseStatus::Complete => stats.completed += 1,
            PhaseStatus::InProgress => stats.in_progress += 1,
            PhaseStatus::Pending => {}
        }
        if phase.is_blocked {
            stats.blocked += 1;
        }
    }
    for bug in bugs_for(bugs, &project.slug) {
        stats.open_bugs += 1;
        if bug.severity == Severity::Critical {
            stats.critical_bugs += 1;
        }
    }

    ProjectRollup {
        project,
        phases,
        stats,
    }
}

/// Full read-only snapshot of active projects, tradelines and focus
pub fn build_status(store: &dyn Store) -> Result<StatusRollup> {
    let projects = store.list_active_projects()?;
    let phases = store.list_phases_with_deps()?;
    let tradelines = store.list_tradelines(None)?;
    let current_focus = store.active_focus(None)?;
    let bugs = store.list_active_bugs(&ALL_SEVERITIES, None)?;

    let summary = RollupSummary {
        total_projects: projects.len(),
        active_projects: projects
            .iter()
            .filter(|project| {
                phases.iter().any(|p| {
                    p.phase.project_id == project.id && p.phase.status == PhaseStatus::InProgress
                })
            })
            .count(),
        total_phases: phases.len(),
        completed_phases: phases
            .iter()
            .filter(|p| p.phase.status == PhaseStatus::Complete)
            .count(),
        blocked_phases: phases.iter().filter(|p| p.is_blocked).count(),
        live_tradelines: tradelines
            .iter()
            .filter(|t| t.status == TradelineStatus::Live)
            .count(),
    };

    let projects = projects
        .into_iter()
        .map(|project| project_rollup(project, &phases, &bugs))
        .collect();

    Ok(StatusRollup {
        projects,
        tradelines,
        current_focus,
        summary,
    })
}

pub struct StatusService {
    store: Arc<dyn Store>,
}

impl StatusService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn snapshot(&self) -> Result<StatusRollup> {
        build_status(self.store.as_ref())
    }
}

use ryan_schemas::{
    Bug, BugId, FocusView, PhaseId, PhaseStatus, PhaseWithDeps, Severity, Tradeline, TradelineId,
    TradelineStatus,
};
use ryan_store::Store;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

pub const IN_PROGRESS_BONUS: i64 = 100;
pub const UNBLOCK_BONUS: i64 = 20;
pub const ACTIVE_PROJECT_BONUS: i64 = 10;
/// Sort orders at or above this contribute nothing
pub const SORT_ORDER_CEILING: i64 = 10;

pub const DEFAULT_ACTIVE_PROJECTS: [&str; 5] = ["kodiack", "core", "engine", "portal", "sources"];

const ALTERNATIVE_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Substrings of project slugs that earn the active-project bonus (case-sensitive)
    pub active_project_keywords: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            active_project_keywords: DEFAULT_ACTIVE_PROJECTS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

impl ScoringConfig {
    pub fn is_active_project(&self, slug: &str) -> bool {
        self.active_project_keywords
            .iter()
            .any(|keyword| slug.contains(keyword.as_str()))
    }
}

/// An actionable phase with its score and the reasons behind it
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPhase {
    #[serde(flatten)]
    phase: PhaseWithDeps,
    score: i64,
    reasons: Vec<String>,
}

impl ScoredPhase {
    pub fn phase(&self) -> &PhaseWithDeps {
        &self.phase
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }
}

/// Scores one phase against the full phase set
pub fn score_phase(
    candidate: &PhaseWithDeps,
    all_phases: &[PhaseWithDeps],
    config: &ScoringConfig,
) -> ScoredPhase {
    let mut score: i64 = 0;
    let mut reasons = Vec::new();

    if candidate.phase.status == PhaseStatus::InProgress {
        score += IN_PROGRESS_BONUS;
        reasons.push("Already in progress".to_string());
    }

    let unblocks = all_phases
        .iter()
        .filter(|other| other.is_waiting_on(&candidate.phase.id))
        .count() as i64;
    if unblocks > 0 {
        score += unblocks * UNBLOCK_BONUS;
        reasons.push(format!("Unblocks {} other phase(s)", unblocks));
    }

    if config.is_active_project(&candidate.project_slug) {
        score += ACTIVE_PROJECT_BONUS;
        reasons.push("Active project".to_string());
    }

    let order_bonus = SORT_ORDER_CEILING
        .saturating_sub(candidate.phase.sort_order)
        .max(0);
    score = score.saturating_add(order_bonus);

    ScoredPhase {
        phase: candidate.clone(),
        score,
        reasons,
    }
}

/// Actionable phases, highest score first. Equal scores keep their input order.
pub fn rank_phases(phases: &[PhaseWithDeps], config: &ScoringConfig) -> Vec<ScoredPhase> {
    let mut scored: Vec<ScoredPhase> = phases
        .iter()
        .filter(|p| p.is_actionable())
        .map(|p| score_phase(p, phases, config))
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub project: String,
    pub project_slug: String,
    pub phase: String,
    pub phase_id: PhaseId,
    pub status: PhaseStatus,
    pub score: i64,
    pub reasons: Vec<String>,
    pub description: Option<String>,
}

impl From<&ScoredPhase> for Recommendation {
    fn from(scored: &ScoredPhase) -> Self {
        let view = scored.phase();
        Self {
            project: view.project_name.clone(),
            project_slug: view.project_slug.clone(),
            phase: view.phase.name.clone(),
            phase_id: view.phase.id.clone(),
            status: view.phase.status,
            score: scored.score(),
            reasons: scored.reasons().to_vec(),
            description: view.phase.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alternative {
    pub project: String,
    pub phase: String,
    pub phase_id: PhaseId,
    pub score: i64,
}

impl From<&ScoredPhase> for Alternative {
    fn from(scored: &ScoredPhase) -> Self {
        let view = scored.phase();
        Self {
            project: view.project_name.clone(),
            phase: view.phase.name.clone(),
            phase_id: view.phase.id.clone(),
            score: scored.score(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    CriticalBugs,
    Monitoring,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WarningItem {
    Bug { id: BugId, title: String },
    Tradeline { id: TradelineId, name: String },
}

/// Advisory only; never suppresses a recommendation
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
    pub items: Vec<WarningItem>,
}

pub fn collect_warnings(critical_bugs: &[Bug], testing_tradelines: &[Tradeline]) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if !critical_bugs.is_empty() {
        warnings.push(Warning {
            kind: WarningKind::CriticalBugs,
            message: format!("{} critical bug(s) need attention", critical_bugs.len()),
            items: critical_bugs
                .iter()
                .map(|b| WarningItem::Bug {
                    id: b.id.clone(),
                    title: b.title.clone(),
                })
                .collect(),
        });
    }

    if !testing_tradelines.is_empty() {
        warnings.push(Warning {
            kind: WarningKind::Monitoring,
            message: format!(
                "{} tradeline(s) in testing - monitor before adding more",
                testing_tradelines.len()
            ),
            items: testing_tradelines
                .iter()
                .map(|t| WarningItem::Tradeline {
                    id: t.id.clone(),
                    name: t.name.clone(),
                })
                .collect(),
        });
    }

    warnings
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub total_phases: usize,
    pub actionable: usize,
    pub blocked: usize,
    pub in_progress: usize,
    pub complete: usize,
}

impl PhaseSummary {
    pub fn of(phases: &[PhaseWithDeps]) -> Self {
        let count_status =
            |status: PhaseStatus| phases.iter().filter(|p| p.phase.status == status).count();

        Self {
            total_phases: phases.len(),
            actionable: phases.iter().filter(|p| p.is_actionable()).count(),
            blocked: phases.iter().filter(|p| p.is_blocked).count(),
            in_progress: count_status(PhaseStatus::InProgress),
            complete: count_status(PhaseStatus::Complete),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WhatsNext {
    pub recommendation: Option<Recommendation>,
    pub alternatives: Vec<Alternative>,
    pub current_focus: Option<FocusView>,
    pub warnings: Vec<Warning>,
    pub summary: PhaseSummary,
}

/// Everything the scorer reads, already loaded
pub struct ScoringInput<'a> {
    pub phases: &'a [PhaseWithDeps],
    pub critical_bugs: &'a [Bug],
    pub testing_tradelines: &'a [Tradeline],
    pub current_focus: Option<FocusView>,
}

/// Pure recommendation over loaded state
pub fn evaluate(input: ScoringInput<'_>, config: &ScoringConfig) -> WhatsNext {
    let ranked = rank_phases(input.phases, config);

    WhatsNext {
        recommendation: ranked.first().map(Recommendation::from),
        alternatives: ranked
            .iter()
            .skip(1)
            .take(ALTERNATIVE_COUNT)
            .map(Alternative::from)
            .collect(),
        current_focus: input.current_focus,
        warnings: collect_warnings(input.critical_bugs, input.testing_tradelines),
        summary: PhaseSummary::of(input.phases),
    }
}

/// "What's next": reads the phase graph and ranks it
pub struct Scorer {
    store: Arc<dyn Store>,
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(store: Arc<dyn Store>, config: ScoringConfig) -> Self {
        Self { store, config }
    }

    /// Any failed read aborts the whole computation
    pub fn whats_next(&self) -> Result<WhatsNext> {
        let phases = self.store.list_phases_with_deps()?;
        let current_focus = self.store.active_focus(Some(1))?.into_iter().next();
        let critical_bugs = self.store.list_active_bugs(&[Severity::Critical], None)?;
        let testing_tradelines = self
            .store
            .list_tradelines(Some(TradelineStatus::Testing))?;

        let result = evaluate(
            ScoringInput {
                phases: &phases,
                critical_bugs: &critical_bugs,
                testing_tradelines: &testing_tradelines,
                current_focus,
            },
            &self.config,
        );

        debug!(
            "Ranked {} actionable of {} phases",
            result.summary.actionable, result.summary.total_phases
        );
        Ok(result)
    }
}

use chrono::{DateTime, Duration, Utc};
use ryan_schemas::{
    Bug, FocusView, PhaseStatus, PhaseWithDeps, PhaseWithProject, Severity, Tradeline,
    TradelineStatus,
};
use ryan_store::{format_timestamp, Store};
use serde::Serialize;
use std::sync::Arc;

use crate::error::Result;

pub const FOCUS_LIMIT: usize = 3;
pub const RECENT_WINDOW_DAYS: i64 = 7;
pub const RECENT_LIMIT: usize = 5;
pub const BUG_LIMIT: usize = 10;

const HEADER: &str = "=== RYAN'S PROJECT BRIEFING ===";
const FOOTER: &str = "=== END BRIEFING ===";

#[derive(Debug, Clone, Serialize)]
pub struct TradelineDigest {
    pub live: Vec<Tradeline>,
    pub testing: Vec<Tradeline>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BriefingData {
    pub current_focus: Vec<FocusView>,
    pub in_progress: Vec<PhaseWithDeps>,
    pub blocked: Vec<PhaseWithDeps>,
    pub recently_completed: Vec<PhaseWithProject>,
    pub tradelines: TradelineDigest,
    pub bugs: Vec<Bug>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Briefing {
    pub briefing: String,
    pub data: BriefingData,
}

/// Renders the session-start digest as plain text
pub struct BriefingRenderer;

impl BriefingRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, data: &BriefingData) -> String {
        let mut lines = vec![HEADER.to_string(), String::new()];

        if !data.current_focus.is_empty() {
            lines.push("CURRENT FOCUS:".to_string());
            for (i, focus) in data.current_focus.iter().enumerate() {
                lines.push(format!(
                    "   {}. {} - {}",
                    i + 1,
                    focus.project_name,
                    focus.phase_name
                ));
                if let Some(rationale) = &focus.focus.rationale {
                    lines.push(format!("      Why: {}", rationale));
                }
            }
            lines.push(String::new());
        }

        if !data.in_progress.is_empty() {
            lines.push("IN PROGRESS:".to_string());
            for phase in &data.in_progress {
                lines.push(format!("   • {}: {}", phase.project_name, phase.phase.name));
            }
            lines.push(String::new());
        }

        if !data.blocked.is_empty() {
            lines.push("BLOCKED (waiting on dependencies):".to_string());
            for phase in &data.blocked {
                lines.push(format!(
                    "   • {}: {} ({} blocker(s))",
                    phase.project_name, phase.phase.name, phase.blocking_deps_count
                ));
            }
            lines.push(String::new());
        }

        if !data.recently_completed.is_empty() {
            lines.push("RECENTLY COMPLETED:".to_string());
            for phase in &data.recently_completed {
                lines.push(format!(
                    "   • {}: {} ({})",
                    phase.project_name,
                    phase.phase.name,
                    self.format_date(phase.phase.completed_at.as_deref())
                ));
            }
            lines.push(String::new());
        }

        if data.tradelines.total > 0 {
            lines.push("TRADELINES:".to_string());
            lines.push(format!(
                "   Live: {} | Testing: {} | Total: {}",
                data.tradelines.live.len(),
                data.tradelines.testing.len(),
                data.tradelines.total
            ));
            for tradeline in &data.tradelines.live {
                lines.push(format!(
                    "   • {}: {} discoveries",
                    tradeline.name, tradeline.discovery_count
                ));
            }
            lines.push(String::new());
        }

        if !data.bugs.is_empty() {
            lines.push("ATTENTION NEEDED:".to_string());
            for bug in &data.bugs {
                lines.push(format!(
                    "   • [{}] {}",
                    bug.severity.as_str().to_uppercase(),
                    bug.title
                ));
            }
            lines.push(String::new());
        }

        lines.push(FOOTER.to_string());
        lines.join("\n")
    }

    fn format_date(&self, timestamp: Option<&str>) -> String {
        match timestamp {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => "unknown".to_string(),
        }
    }
}

impl Default for BriefingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Composite read-only digest of focus, phases, tradelines and bugs
pub struct BriefingService {
    store: Arc<dyn Store>,
    renderer: BriefingRenderer,
}

impl BriefingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            renderer: BriefingRenderer::new(),
        }
    }

    pub fn build(&self) -> Result<Briefing> {
        self.build_at(Utc::now())
    }

    pub fn build_at(&self, now: DateTime<Utc>) -> Result<Briefing> {
        let current_focus = self.store.active_focus(Some(FOCUS_LIMIT))?;

        let phases = self.store.list_phases_with_deps()?;
        let in_progress: Vec<PhaseWithDeps> = phases
            .iter()
            .filter(|p| p.phase.status == PhaseStatus::InProgress)
            .cloned()
            .collect();
        let blocked: Vec<PhaseWithDeps> = phases.into_iter().filter(|p| p.is_blocked).collect();

        let since = format_timestamp(now - Duration::days(RECENT_WINDOW_DAYS));
        let recently_completed = self.store.recently_completed_phases(&since, RECENT_LIMIT)?;

        let tradelines = self.store.list_tradelines(None)?;
        let total = tradelines.len();
        let (live, testing) = tradelines.into_iter().fold(
            (Vec::new(), Vec::new()),
            |(mut live, mut testing), tradeline| {
                match tradeline.status {
                    TradelineStatus::Live => live.push(tradeline),
                    TradelineStatus::Testing => testing.push(tradeline),
                    _ => {}
                }
                (live, testing)
            },
        );

        let bugs = self
            .store
            .list_active_bugs(&[Severity::Critical, Severity::High], Some(BUG_LIMIT))?;

        let data = BriefingData {
            current_focus,
            in_progress,
            blocked,
            recently_completed,
            tradelines: TradelineDigest {
                live,
                testing,
                total,
            },
            bugs,
        };

        Ok(Briefing {
            briefing: self.renderer.render(&data),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use ryan_schemas::{NewBug, NewFocus, NewTradeline};
    use ryan_store::Database;

    fn empty_data() -> BriefingData {
        BriefingData {
            current_focus: vec![],
            in_progress: vec![],
            blocked: vec![],
            recently_completed: vec![],
            tradelines: TradelineDigest {
                live: vec![],
                testing: vec![],
                total: 0,
            },
            bugs: vec![],
        }
    }

    #[test]
    fn test_empty_briefing_is_just_the_frame() {
        let text = BriefingRenderer::new().render(&empty_data());
        assert_eq!(text, format!("{}\n\n{}", HEADER, FOOTER));
    }

    #[test]
    fn test_format_date_falls_back_to_raw() {
        let renderer = BriefingRenderer::new();
        assert_eq!(
            renderer.format_date(Some("2025-06-10T08:30:00.000000Z")),
            "2025-06-10"
        );
        assert_eq!(renderer.format_date(Some("yesterday")), "yesterday");
        assert_eq!(renderer.format_date(None), "unknown");
    }

    #[test]
    fn test_build_from_store() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let portal = testing::project(db.as_ref(), "Portal", "portal");
        let login = testing::phase(db.as_ref(), &portal, "Login", PhaseStatus::InProgress, 0);
        let billing = testing::phase(db.as_ref(), &portal, "Billing", PhaseStatus::Pending, 1);
        let shipped = testing::phase(db.as_ref(), &portal, "Signup", PhaseStatus::Pending, 2);
        let ancient = testing::phase(db.as_ref(), &portal, "Prototype", PhaseStatus::Pending, 3);
        testing::block(db.as_ref(), &billing, &login);

        let now = Utc::now();
        db.complete_phase(&shipped.id, &format_timestamp(now - Duration::days(2)))
            .unwrap();
        db.complete_phase(&ancient.id, &format_timestamp(now - Duration::days(30)))
            .unwrap();

        db.insert_focus(&NewFocus {
            project_id: portal.id.clone(),
            phase_id: login.id.clone(),
            priority: 1,
            rationale: "Launch blocker".to_string(),
            set_by: "user".to_string(),
        })
        .unwrap();

        for (slug, status) in [
            ("permits", TradelineStatus::Live),
            ("licenses", TradelineStatus::Testing),
            ("liens", TradelineStatus::Development),
        ] {
            db.insert_tradeline(&NewTradeline {
                name: slug.to_uppercase(),
                slug: slug.to_string(),
                status,
                port_number: None,
                server_path: None,
                droplet_ip: None,
                notes: None,
            })
            .unwrap();
        }

        db.insert_bug(&NewBug {
            title: "Checkout 500s".to_string(),
            severity: Severity::High,
            status: "investigating".to_string(),
            project_path: Some("/srv/portal".to_string()),
        })
        .unwrap();

        let briefing = BriefingService::new(db.clone()).build_at(now).unwrap();
        let data = &briefing.data;

        assert_eq!(data.current_focus.len(), 1);
        assert_eq!(data.in_progress.len(), 1);
        assert_eq!(data.blocked.len(), 1);
        assert_eq!(data.recently_completed.len(), 1);
        assert_eq!(data.recently_completed[0].phase.name, "Signup");
        assert_eq!(data.tradelines.total, 3);
        assert_eq!(data.tradelines.live.len(), 1);
        assert_eq!(data.tradelines.testing.len(), 1);
        assert_eq!(data.bugs.len(), 1);

        let text = &briefing.briefing;
        assert!(text.starts_with(HEADER));
        assert!(text.ends_with(FOOTER));
        assert!(text.contains("   1. Portal - Login"));
        assert!(text.contains("      Why: Launch blocker"));
        assert!(text.contains("Portal: Billing (1 blocker(s))"));
        assert!(text.contains("Live: 1 | Testing: 1 | Total: 3"));
        assert!(text.contains("[HIGH] Checkout 500s"));
        assert!(!text.contains("Prototype"));
    }
}

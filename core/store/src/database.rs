use chrono::{DateTime, SecondsFormat, Utc};
use ryan_schemas::{
    generate_bug_id, generate_dependency_id, generate_focus_id, generate_knowledge_id,
    generate_phase_id, generate_project_id, generate_todo_id, generate_tradeline_id,
    generate_usage_id, Bug, BugId, CurrentFocus, DependencyDetail, DependencyId, DependencyTarget,
    FocusId, FocusView, KnowledgeEntry, KnowledgeId, NewBug, NewDependency, NewFocus,
    NewKnowledgeEntry, NewPhase, NewProject, NewTodo, NewTradeline, Phase, PhaseDependency,
    PhaseId, PhasePatch, PhaseStatus, PhaseWithDeps, PhaseWithProject, Project, ProjectId,
    Severity, Todo, TodoId, TodoPriority, Tradeline, TradelineId, TradelinePatch, TradelineRun,
    TradelineStatus, UsageId, UsageRecord, ACTIVE_BUG_STATUSES,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::gateway::{CounterField, Store};

/// Every stored timestamp uses this fixed-width form so that text ordering
/// matches time ordering.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        parent_id TEXT REFERENCES projects(id),
        client_id TEXT,
        is_parent INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    -- A project may own several filesystem paths; todos are keyed by path
    CREATE TABLE IF NOT EXISTS project_paths (
        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        path TEXT NOT NULL,
        PRIMARY KEY (project_id, path)
    );

    CREATE TABLE IF NOT EXISTS phases (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        sort_order INTEGER NOT NULL DEFAULT 0,
        started_at TEXT,
        completed_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS phase_dependencies (
        id TEXT PRIMARY KEY,
        phase_id TEXT NOT NULL REFERENCES phases(id) ON DELETE CASCADE,
        depends_on_phase_id TEXT NOT NULL REFERENCES phases(id) ON DELETE CASCADE,
        dependency_type TEXT NOT NULL DEFAULT 'blocks',
        notes TEXT,
        created_at TEXT NOT NULL,
        UNIQUE (phase_id, depends_on_phase_id),
        CHECK (phase_id != depends_on_phase_id)
    );

    CREATE TABLE IF NOT EXISTS current_focus (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        phase_id TEXT NOT NULL REFERENCES phases(id) ON DELETE CASCADE,
        priority INTEGER NOT NULL DEFAULT 1,
        rationale TEXT,
        set_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        completed_at TEXT
    );

    CREATE TABLE IF NOT EXISTS todos (
        id TEXT PRIMARY KEY,
        project_path TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        priority TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        category TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tradelines (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL DEFAULT 'pending',
        port_number INTEGER,
        server_path TEXT,
        droplet_ip TEXT,
        notes TEXT,
        discovery_count INTEGER NOT NULL DEFAULT 0,
        error_count INTEGER NOT NULL DEFAULT 0,
        last_run_at TEXT,
        last_success_at TEXT,
        last_error TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS bugs (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        severity TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'open',
        project_path TEXT,
        created_at TEXT NOT NULL
    );

    -- Append-only; roadmap artifacts live here under category 'Roadmap'
    CREATE TABLE IF NOT EXISTS knowledge_entries (
        id TEXT PRIMARY KEY,
        project_path TEXT NOT NULL,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        category TEXT NOT NULL,
        source TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS ai_usage (
        id TEXT PRIMARY KEY,
        model TEXT NOT NULL,
        input_tokens INTEGER NOT NULL,
        output_tokens INTEGER NOT NULL,
        cost_usd REAL NOT NULL,
        task_type TEXT,
        assistant_name TEXT NOT NULL,
        prompt_preview TEXT,
        created_at TEXT NOT NULL
    );

    -- Edges that currently hold a phase back: both ends unfinished
    CREATE VIEW IF NOT EXISTS blocking_edges AS
        SELECT d.phase_id, d.depends_on_phase_id
        FROM phase_dependencies d
        JOIN phases waiting ON waiting.id = d.phase_id
        JOIN phases target ON target.id = d.depends_on_phase_id
        WHERE d.dependency_type = 'blocks'
          AND waiting.status != 'complete'
          AND target.status != 'complete';

    CREATE INDEX IF NOT EXISTS idx_phases_project ON phases(project_id, sort_order);
    CREATE INDEX IF NOT EXISTS idx_focus_active ON current_focus(completed_at, priority);
    CREATE INDEX IF NOT EXISTS idx_todos_path ON todos(project_path);
    CREATE INDEX IF NOT EXISTS idx_knowledge_lookup
        ON knowledge_entries(category, source, created_at DESC);
";

const PROJECT_COLUMNS: &str = "id, name, slug, parent_id, client_id, is_parent, is_active,
     sort_order, created_at, updated_at";

const PHASE_COLUMNS: &str = "ph.id, ph.project_id, ph.name, ph.description, ph.status,
     ph.sort_order, ph.started_at, ph.completed_at, ph.created_at, ph.updated_at";

const TODO_COLUMNS: &str = "id, project_path, title, description, priority, status, category,
     created_at, updated_at";

const TRADELINE_COLUMNS: &str = "id, name, slug, status, port_number, server_path, droplet_ip,
     notes, discovery_count, error_count, last_run_at, last_success_at, last_error,
     created_at, updated_at";

const FOCUS_COLUMNS: &str = "f.id, f.project_id, f.phase_id, f.priority, f.rationale, f.set_by,
     f.created_at, f.completed_at";

/// SQLite-backed implementation of [`Store`]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database file and make sure the schema exists
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self::from_connection(conn)?;

        info!("Database initialized");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn parse_text<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ProjectId(row.get(0)?),
        name: row.get(1)?,
        slug: row.get(2)?,
        parent_id: row.get::<_, Option<String>>(3)?.map(ProjectId),
        client_id: row.get(4)?,
        is_parent: row.get(5)?,
        is_active: row.get(6)?,
        sort_order: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Maps the ten `PHASE_COLUMNS`, which always lead the select list
fn row_to_phase(row: &Row) -> rusqlite::Result<Phase> {
    Ok(Phase {
        id: PhaseId(row.get(0)?),
        project_id: ProjectId(row.get(1)?),
        name: row.get(2)?,
        description: row.get(3)?,
        status: parse_text(row, 4)?,
        sort_order: row.get(5)?,
        started_at: row.get(6)?,
        completed_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn row_to_focus(row: &Row) -> rusqlite::Result<CurrentFocus> {
    Ok(CurrentFocus {
        id: FocusId(row.get(0)?),
        project_id: ProjectId(row.get(1)?),
        phase_id: PhaseId(row.get(2)?),
        priority: row.get(3)?,
        rationale: row.get(4)?,
        set_by: row.get(5)?,
        created_at: row.get(6)?,
        completed_at: row.get(7)?,
    })
}

fn row_to_todo(row: &Row) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: TodoId(row.get(0)?),
        project_path: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        priority: row.get(4)?,
        status: row.get(5)?,
        category: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_tradeline(row: &Row) -> rusqlite::Result<Tradeline> {
    Ok(Tradeline {
        id: TradelineId(row.get(0)?),
        name: row.get(1)?,
        slug: row.get(2)?,
        status: parse_text(row, 3)?,
        port_number: row.get(4)?,
        server_path: row.get(5)?,
        droplet_ip: row.get(6)?,
        notes: row.get(7)?,
        discovery_count: row.get(8)?,
        error_count: row.get(9)?,
        last_run_at: row.get(10)?,
        last_success_at: row.get(11)?,
        last_error: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn row_to_bug(row: &Row) -> rusqlite::Result<Bug> {
    Ok(Bug {
        id: BugId(row.get(0)?),
        title: row.get(1)?,
        severity: parse_text(row, 2)?,
        status: row.get(3)?,
        project_path: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_knowledge(row: &Row) -> rusqlite::Result<KnowledgeEntry> {
    Ok(KnowledgeEntry {
        id: KnowledgeId(row.get(0)?),
        project_path: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        category: row.get(4)?,
        source: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn limit_param(limit: Option<usize>) -> i64 {
    // SQLite treats a negative LIMIT as unbounded
    limit.map(|l| l as i64).unwrap_or(-1)
}

// ============================================================================
// Connection-level helpers (shared by plain calls and transactions)
// ============================================================================

fn fetch_project(conn: &Connection, id: &ProjectId) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
            params![id.0],
            row_to_project,
        )
        .optional()?;
    Ok(project)
}

fn fetch_phase(conn: &Connection, id: &PhaseId) -> Result<Option<Phase>> {
    let phase = conn
        .query_row(
            &format!("SELECT {} FROM phases ph WHERE ph.id = ?1", PHASE_COLUMNS),
            params![id.0],
            row_to_phase,
        )
        .optional()?;
    Ok(phase)
}

fn require_phase(conn: &Connection, id: &PhaseId) -> Result<Phase> {
    fetch_phase(conn, id)?.ok_or_else(|| StoreError::not_found("phase", id))
}

fn fetch_tradeline(conn: &Connection, id: &TradelineId) -> Result<Option<Tradeline>> {
    let tradeline = conn
        .query_row(
            &format!("SELECT {} FROM tradelines WHERE id = ?1", TRADELINE_COLUMNS),
            params![id.0],
            row_to_tradeline,
        )
        .optional()?;
    Ok(tradeline)
}

fn fetch_todo(conn: &Connection, id: &TodoId) -> Result<Option<Todo>> {
    let todo = conn
        .query_row(
            &format!("SELECT {} FROM todos WHERE id = ?1", TODO_COLUMNS),
            params![id.0],
            row_to_todo,
        )
        .optional()?;
    Ok(todo)
}

fn bump_counter(conn: &Connection, field: CounterField, id: &str, delta: i64) -> Result<usize> {
    // Table and column names come from the closed `CounterField` enum
    let sql = format!(
        "UPDATE {table} SET {column} = {column} + ?1 WHERE id = ?2",
        table = field.table(),
        column = field.column(),
    );
    let changed = conn.execute(&sql, params![delta, id])?;
    Ok(changed)
}

impl Store for Database {
    // === Projects ===

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM projects ORDER BY name",
            PROJECT_COLUMNS
        ))?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    fn list_active_projects(&self) -> Result<Vec<Project>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM projects WHERE is_active = 1 ORDER BY sort_order, name",
            PROJECT_COLUMNS
        ))?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    fn get_project(&self, id: &ProjectId) -> Result<Option<Project>> {
        let conn = self.lock()?;
        fetch_project(&conn, id)
    }

    fn insert_project(&self, project: &NewProject) -> Result<Project> {
        let conn = self.lock()?;

        let slug_taken: Option<String> = conn
            .query_row(
                "SELECT id FROM projects WHERE slug = ?1",
                params![project.slug],
                |row| row.get(0),
            )
            .optional()?;
        if slug_taken.is_some() {
            return Err(StoreError::Validation(format!(
                "project slug already exists: {}",
                project.slug
            )));
        }

        if let Some(parent_id) = &project.parent_id {
            if fetch_project(&conn, parent_id)?.is_none() {
                return Err(StoreError::not_found("project", parent_id));
            }
        }

        let id = generate_project_id();
        let now = now_timestamp();

        conn.execute(
            "INSERT INTO projects (id, name, slug, parent_id, client_id, is_parent, is_active,
                                   sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id.0,
                project.name,
                project.slug,
                project.parent_id.as_ref().map(|p| p.0.as_str()),
                project.client_id,
                project.is_parent,
                project.is_active,
                project.sort_order,
                now,
                now,
            ],
        )?;

        info!("Created project: {} ({})", project.name, id);
        fetch_project(&conn, &id)?.ok_or_else(|| StoreError::not_found("project", &id))
    }

    fn list_project_paths(&self, project_id: &ProjectId) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT path FROM project_paths WHERE project_id = ?1 ORDER BY path")?;
        let paths = stmt
            .query_map(params![project_id.0], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(paths)
    }

    fn add_project_path(&self, project_id: &ProjectId, path: &str) -> Result<()> {
        let conn = self.lock()?;
        if fetch_project(&conn, project_id)?.is_none() {
            return Err(StoreError::not_found("project", project_id));
        }

        conn.execute(
            "INSERT OR IGNORE INTO project_paths (project_id, path) VALUES (?1, ?2)",
            params![project_id.0, path],
        )?;

        debug!("Registered path {} for project {}", path, project_id);
        Ok(())
    }

    // === Phases ===

    fn list_phases_with_deps(&self) -> Result<Vec<PhaseWithDeps>> {
        let conn = self.lock()?;

        let mut blocking: HashMap<String, Vec<PhaseId>> = HashMap::new();
        {
            let mut stmt =
                conn.prepare("SELECT phase_id, depends_on_phase_id FROM blocking_edges")?;
            let edges = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (phase_id, depends_on) in edges {
                blocking.entry(phase_id).or_default().push(PhaseId(depends_on));
            }
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {}, p.name, p.slug
             FROM phases ph
             JOIN projects p ON p.id = ph.project_id
             ORDER BY p.sort_order, p.name, ph.sort_order, ph.created_at",
            PHASE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row_to_phase(row)?, row.get::<_, String>(10)?, row.get::<_, String>(11)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let phases = rows
            .into_iter()
            .map(|(phase, project_name, project_slug)| {
                let blocking_phase_ids = blocking.remove(&phase.id.0).unwrap_or_default();
                PhaseWithDeps {
                    phase,
                    project_name,
                    project_slug,
                    is_blocked: !blocking_phase_ids.is_empty(),
                    blocking_deps_count: blocking_phase_ids.len(),
                    blocking_phase_ids,
                }
            })
            .collect();

        Ok(phases)
    }

    fn get_phase(&self, id: &PhaseId) -> Result<Option<Phase>> {
        let conn = self.lock()?;
        fetch_phase(&conn, id)
    }

    fn list_project_phases(&self, project_id: &ProjectId) -> Result<Vec<Phase>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM phases ph WHERE ph.project_id = ?1 ORDER BY ph.sort_order, ph.created_at",
            PHASE_COLUMNS
        ))?;
        let phases = stmt
            .query_map(params![project_id.0], row_to_phase)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(phases)
    }

    fn insert_phase(&self, phase: &NewPhase) -> Result<Phase> {
        let conn = self.lock()?;
        if fetch_project(&conn, &phase.project_id)?.is_none() {
            return Err(StoreError::not_found("project", &phase.project_id));
        }

        let id = generate_phase_id();
        let now = now_timestamp();

        conn.execute(
            "INSERT INTO phases (id, project_id, name, description, status, sort_order,
                                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.0,
                phase.project_id.0,
                phase.name,
                phase.description,
                phase.status.as_str(),
                phase.sort_order,
                now,
                now,
            ],
        )?;

        debug!("Inserted phase: {} ({})", phase.name, id);
        require_phase(&conn, &id)
    }

    fn update_phase(&self, id: &PhaseId, patch: &PhasePatch, now: &str) -> Result<Phase> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE phases SET
                name = COALESCE(?1, name),
                description = COALESCE(?2, description),
                status = COALESCE(?3, status),
                sort_order = COALESCE(?4, sort_order),
                started_at = COALESCE(?5, started_at),
                completed_at = COALESCE(?6, completed_at),
                updated_at = ?7
             WHERE id = ?8",
            params![
                patch.name,
                patch.description,
                patch.status.map(|s| s.as_str()),
                patch.sort_order,
                patch.started_at,
                patch.completed_at,
                now,
                id.0,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::not_found("phase", id));
        }

        if patch.status == Some(PhaseStatus::Complete) {
            let completed_at = patch.completed_at.as_deref().unwrap_or(now);
            let retired = tx.execute(
                "UPDATE current_focus SET completed_at = ?1
                 WHERE phase_id = ?2 AND completed_at IS NULL",
                params![completed_at, id.0],
            )?;
            debug!("Completed phase {} via update (retired {} focus record(s))", id, retired);
        }

        let phase = require_phase(&tx, id)?;
        tx.commit()?;
        Ok(phase)
    }

    fn start_phase(&self, id: &PhaseId, now: &str) -> Result<Phase> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE phases SET
                status = 'in_progress',
                started_at = COALESCE(started_at, ?1),
                updated_at = ?1
             WHERE id = ?2",
            params![now, id.0],
        )?;

        if changed == 0 {
            return Err(StoreError::not_found("phase", id));
        }
        require_phase(&conn, id)
    }

    fn complete_phase(&self, id: &PhaseId, now: &str) -> Result<Phase> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        require_phase(&tx, id)?;

        let retired = tx.execute(
            "UPDATE current_focus SET completed_at = ?1
             WHERE phase_id = ?2 AND completed_at IS NULL",
            params![now, id.0],
        )?;

        tx.execute(
            "UPDATE phases SET status = 'complete', completed_at = ?1, updated_at = ?1
             WHERE id = ?2",
            params![now, id.0],
        )?;

        let phase = require_phase(&tx, id)?;
        tx.commit()?;

        debug!("Completed phase {} (retired {} focus record(s))", id, retired);
        Ok(phase)
    }

    fn delete_phase(&self, id: &PhaseId) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM phases WHERE id = ?1", params![id.0])?;
        Ok(changed > 0)
    }

    fn recently_completed_phases(
        &self,
        since: &str,
        limit: usize,
    ) -> Result<Vec<PhaseWithProject>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, p.name, p.slug
             FROM phases ph
             JOIN projects p ON p.id = ph.project_id
             WHERE ph.status = 'complete' AND ph.completed_at >= ?1
             ORDER BY ph.completed_at DESC
             LIMIT ?2",
            PHASE_COLUMNS
        ))?;
        let phases = stmt
            .query_map(params![since, limit as i64], |row| {
                Ok(PhaseWithProject {
                    phase: row_to_phase(row)?,
                    project_name: row.get(10)?,
                    project_slug: row.get(11)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(phases)
    }

    // === Dependencies ===

    fn list_dependencies(&self, phase_id: &PhaseId) -> Result<Vec<DependencyDetail>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT d.id, d.phase_id, d.depends_on_phase_id, d.dependency_type, d.notes,
                    d.created_at, t.id, t.name, t.status, p.name, p.slug
             FROM phase_dependencies d
             JOIN phases t ON t.id = d.depends_on_phase_id
             JOIN projects p ON p.id = t.project_id
             WHERE d.phase_id = ?1
             ORDER BY d.created_at",
        )?;
        let deps = stmt
            .query_map(params![phase_id.0], |row| {
                Ok(DependencyDetail {
                    dependency: PhaseDependency {
                        id: DependencyId(row.get(0)?),
                        phase_id: PhaseId(row.get(1)?),
                        depends_on_phase_id: PhaseId(row.get(2)?),
                        dependency_type: row.get(3)?,
                        notes: row.get(4)?,
                        created_at: row.get(5)?,
                    },
                    depends_on: DependencyTarget {
                        id: PhaseId(row.get(6)?),
                        name: row.get(7)?,
                        status: parse_text(row, 8)?,
                        project_name: row.get(9)?,
                        project_slug: row.get(10)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(deps)
    }

    fn insert_dependency(&self, dependency: &NewDependency) -> Result<PhaseDependency> {
        if dependency.is_self_loop() {
            return Err(StoreError::Validation(
                "A phase cannot depend on itself".to_string(),
            ));
        }

        let conn = self.lock()?;
        require_phase(&conn, &dependency.phase_id)?;
        require_phase(&conn, &dependency.depends_on_phase_id)?;

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM phase_dependencies
                 WHERE phase_id = ?1 AND depends_on_phase_id = ?2",
                params![dependency.phase_id.0, dependency.depends_on_phase_id.0],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::Validation(format!(
                "Dependency already exists: {} -> {}",
                dependency.phase_id, dependency.depends_on_phase_id
            )));
        }

        let record = PhaseDependency {
            id: generate_dependency_id(),
            phase_id: dependency.phase_id.clone(),
            depends_on_phase_id: dependency.depends_on_phase_id.clone(),
            dependency_type: dependency.dependency_type.clone(),
            notes: dependency.notes.clone(),
            created_at: now_timestamp(),
        };

        conn.execute(
            "INSERT INTO phase_dependencies (id, phase_id, depends_on_phase_id, dependency_type,
                                             notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.0,
                record.phase_id.0,
                record.depends_on_phase_id.0,
                record.dependency_type,
                record.notes,
                record.created_at,
            ],
        )?;

        info!(
            "Added dependency: {} depends on {} ({})",
            record.phase_id, record.depends_on_phase_id, record.dependency_type
        );
        Ok(record)
    }

    fn delete_dependency(&self, id: &DependencyId) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM phase_dependencies WHERE id = ?1", params![id.0])?;
        Ok(changed > 0)
    }

    // === Current Focus ===

    fn active_focus(&self, limit: Option<usize>) -> Result<Vec<FocusView>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, p.name, p.slug, ph.name, ph.description, ph.status
             FROM current_focus f
             JOIN projects p ON p.id = f.project_id
             JOIN phases ph ON ph.id = f.phase_id
             WHERE f.completed_at IS NULL
             ORDER BY f.priority, f.created_at DESC
             LIMIT ?1",
            FOCUS_COLUMNS
        ))?;
        let focus = stmt
            .query_map(params![limit_param(limit)], |row| {
                Ok(FocusView {
                    focus: row_to_focus(row)?,
                    project_name: row.get(8)?,
                    project_slug: row.get(9)?,
                    phase_name: row.get(10)?,
                    phase_description: row.get(11)?,
                    phase_status: parse_text(row, 12)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(focus)
    }

    fn insert_focus(&self, focus: &NewFocus) -> Result<CurrentFocus> {
        let conn = self.lock()?;
        let record = CurrentFocus {
            id: generate_focus_id(),
            project_id: focus.project_id.clone(),
            phase_id: focus.phase_id.clone(),
            priority: focus.priority,
            rationale: Some(focus.rationale.clone()),
            set_by: focus.set_by.clone(),
            created_at: now_timestamp(),
            completed_at: None,
        };

        conn.execute(
            "INSERT INTO current_focus (id, project_id, phase_id, priority, rationale, set_by,
                                        created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
            params![
                record.id.0,
                record.project_id.0,
                record.phase_id.0,
                record.priority,
                record.rationale,
                record.set_by,
                record.created_at,
            ],
        )?;

        info!("Focus set on phase {} ({})", record.phase_id, record.id);
        Ok(record)
    }

    // === Todos ===

    fn todos_for_path(&self, project_path: &str) -> Result<Vec<Todo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM todos WHERE project_path = ?1 ORDER BY created_at",
            TODO_COLUMNS
        ))?;
        let todos = stmt
            .query_map(params![project_path], row_to_todo)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(todos)
    }

    fn get_todo(&self, id: &TodoId) -> Result<Option<Todo>> {
        let conn = self.lock()?;
        fetch_todo(&conn, id)
    }

    fn insert_todo(&self, todo: &NewTodo) -> Result<Todo> {
        let conn = self.lock()?;
        let id = generate_todo_id();
        let now = now_timestamp();

        conn.execute(
            "INSERT INTO todos (id, project_path, title, description, priority, status, category,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id.0,
                todo.project_path,
                todo.title,
                todo.description,
                todo.priority,
                todo.status,
                todo.category,
                now,
                now,
            ],
        )?;

        fetch_todo(&conn, &id)?.ok_or_else(|| StoreError::not_found("todo", &id))
    }

    // === Tradelines ===

    fn list_tradelines(&self, status: Option<TradelineStatus>) -> Result<Vec<Tradeline>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tradelines WHERE (?1 IS NULL OR status = ?1) ORDER BY name",
            TRADELINE_COLUMNS
        ))?;
        let tradelines = stmt
            .query_map(params![status.map(|s| s.as_str())], row_to_tradeline)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tradelines)
    }

    fn get_tradeline(&self, id: &TradelineId) -> Result<Option<Tradeline>> {
        let conn = self.lock()?;
        fetch_tradeline(&conn, id)
    }

    fn insert_tradeline(&self, tradeline: &NewTradeline) -> Result<Tradeline> {
        let conn = self.lock()?;

        let slug_taken: Option<String> = conn
            .query_row(
                "SELECT id FROM tradelines WHERE slug = ?1",
                params![tradeline.slug],
                |row| row.get(0),
            )
            .optional()?;
        if slug_taken.is_some() {
            return Err(StoreError::Validation(format!(
                "tradeline slug already exists: {}",
                tradeline.slug
            )));
        }

        let id = generate_tradeline_id();
        let now = now_timestamp();

        conn.execute(
            "INSERT INTO tradelines (id, name, slug, status, port_number, server_path, droplet_ip,
                                     notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id.0,
                tradeline.name,
                tradeline.slug,
                tradeline.status.as_str(),
                tradeline.port_number,
                tradeline.server_path,
                tradeline.droplet_ip,
                tradeline.notes,
                now,
                now,
            ],
        )?;

        info!("Created tradeline: {} ({})", tradeline.name, id);
        fetch_tradeline(&conn, &id)?.ok_or_else(|| StoreError::not_found("tradeline", &id))
    }

    fn update_tradeline(
        &self,
        id: &TradelineId,
        patch: &TradelinePatch,
        now: &str,
    ) -> Result<Tradeline> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE tradelines SET
                name = COALESCE(?1, name),
                slug = COALESCE(?2, slug),
                status = COALESCE(?3, status),
                port_number = COALESCE(?4, port_number),
                server_path = COALESCE(?5, server_path),
                droplet_ip = COALESCE(?6, droplet_ip),
                notes = COALESCE(?7, notes),
                last_success_at = COALESCE(?8, last_success_at),
                updated_at = ?9
             WHERE id = ?10",
            params![
                patch.name,
                patch.slug,
                patch.status.map(|s| s.as_str()),
                patch.port_number,
                patch.server_path,
                patch.droplet_ip,
                patch.notes,
                patch.last_success_at,
                now,
                id.0,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::not_found("tradeline", id));
        }
        fetch_tradeline(&conn, id)?.ok_or_else(|| StoreError::not_found("tradeline", id))
    }

    fn record_tradeline_run(
        &self,
        id: &TradelineId,
        run: &TradelineRun,
        now: &str,
    ) -> Result<Tradeline> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let failure = run.error.as_deref().filter(|e| !e.is_empty());

        let changed = match failure {
            Some(error) => tx.execute(
                "UPDATE tradelines SET last_run_at = ?1, updated_at = ?1, last_error = ?2
                 WHERE id = ?3",
                params![now, error, id.0],
            )?,
            None => tx.execute(
                "UPDATE tradelines SET last_run_at = ?1, updated_at = ?1, last_success_at = ?1,
                                       last_error = NULL
                 WHERE id = ?2",
                params![now, id.0],
            )?,
        };
        if changed == 0 {
            return Err(StoreError::not_found("tradeline", id));
        }

        if failure.is_some() {
            bump_counter(&tx, CounterField::TradelineErrorCount, &id.0, 1)?;
        } else if let Some(discoveries) = run.discoveries.filter(|d| *d > 0) {
            bump_counter(&tx, CounterField::TradelineDiscoveryCount, &id.0, discoveries)?;
        }

        let tradeline =
            fetch_tradeline(&tx, id)?.ok_or_else(|| StoreError::not_found("tradeline", id))?;
        tx.commit()?;

        debug!(
            "Recorded run for tradeline {} (errors: {}, discoveries: {})",
            id, tradeline.error_count, tradeline.discovery_count
        );
        Ok(tradeline)
    }

    fn increment(&self, field: CounterField, id: &str, delta: i64) -> Result<()> {
        let conn = self.lock()?;
        if bump_counter(&conn, field, id, delta)? == 0 {
            return Err(StoreError::not_found(field.entity(), id));
        }
        Ok(())
    }

    // === Bugs ===

    fn list_active_bugs(&self, severities: &[Severity], limit: Option<usize>) -> Result<Vec<Bug>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, severity, status, project_path, created_at
             FROM bugs
             WHERE status IN (?1, ?2)
             ORDER BY created_at DESC",
        )?;
        let bugs = stmt
            .query_map(
                params![ACTIVE_BUG_STATUSES[0], ACTIVE_BUG_STATUSES[1]],
                row_to_bug,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let matching = bugs
            .into_iter()
            .filter(|bug| severities.contains(&bug.severity))
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Ok(matching)
    }

    fn insert_bug(&self, bug: &NewBug) -> Result<Bug> {
        let conn = self.lock()?;
        let record = Bug {
            id: generate_bug_id(),
            title: bug.title.clone(),
            severity: bug.severity,
            status: bug.status.clone(),
            project_path: bug.project_path.clone(),
            created_at: now_timestamp(),
        };

        conn.execute(
            "INSERT INTO bugs (id, title, severity, status, project_path, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.0,
                record.title,
                record.severity.as_str(),
                record.status,
                record.project_path,
                record.created_at,
            ],
        )?;

        Ok(record)
    }

    // === Roadmap artifacts ===

    fn record_priority_analysis(
        &self,
        entry: &NewKnowledgeEntry,
        updates: &[(TodoId, TodoPriority)],
    ) -> Result<(KnowledgeEntry, usize)> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let stored = KnowledgeEntry {
            id: generate_knowledge_id(),
            project_path: entry.project_path.clone(),
            title: entry.title.clone(),
            content: entry.content.clone(),
            category: entry.category.clone(),
            source: entry.source.clone(),
            created_at: now_timestamp(),
        };

        tx.execute(
            "INSERT INTO knowledge_entries (id, project_path, title, content, category, source,
                                            created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                stored.id.0,
                stored.project_path,
                stored.title,
                stored.content,
                stored.category,
                stored.source,
                stored.created_at,
            ],
        )?;

        let mut updated = 0;
        for (todo_id, priority) in updates {
            updated += tx.execute(
                "UPDATE todos SET priority = ?1, updated_at = ?2 WHERE id = ?3",
                params![priority.as_str(), stored.created_at, todo_id.0],
            )?;
        }

        tx.commit()?;

        info!(
            "Stored knowledge entry {} and updated {} of {} todo priorities",
            stored.id,
            updated,
            updates.len()
        );
        Ok((stored, updated))
    }

    fn latest_knowledge_entry(
        &self,
        category: &str,
        source: &str,
    ) -> Result<Option<KnowledgeEntry>> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                "SELECT id, project_path, title, content, category, source, created_at
                 FROM knowledge_entries
                 WHERE category = ?1 AND source = ?2
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT 1",
                params![category, source],
                row_to_knowledge,
            )
            .optional()?;
        Ok(entry)
    }

    // === Usage ===

    fn insert_usage(&self, record: &UsageRecord) -> Result<UsageId> {
        let conn = self.lock()?;
        let id = generate_usage_id();

        conn.execute(
            "INSERT INTO ai_usage (id, model, input_tokens, output_tokens, cost_usd, task_type,
                                   assistant_name, prompt_preview, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id.0,
                record.model,
                record.input_tokens as i64,
                record.output_tokens as i64,
                record.cost_usd,
                record.task_type,
                record.assistant_name,
                record.prompt_preview,
                now_timestamp(),
            ],
        )?;

        Ok(id)
    }

    fn recent_usage(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT model, input_tokens, output_tokens, cost_usd, task_type, assistant_name,
                    prompt_preview
             FROM ai_usage
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit as i64], |row| {
                Ok(UsageRecord {
                    model: row.get(0)?,
                    input_tokens: row.get::<_, i64>(1)? as u64,
                    output_tokens: row.get::<_, i64>(2)? as u64,
                    cost_usd: row.get(3)?,
                    task_type: row.get(4)?,
                    assistant_name: row.get(5)?,
                    prompt_preview: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ryan_schemas::DEFAULT_DEPENDENCY_TYPE;
    use tempfile::NamedTempFile;

    fn seed_project(db: &Database, name: &str, slug: &str) -> Project {
        db.insert_project(&NewProject::new(name, slug)).unwrap()
    }

    fn seed_phase(db: &Database, project: &Project, name: &str, sort_order: i64) -> Phase {
        db.insert_phase(&NewPhase {
            project_id: project.id.clone(),
            name: name.to_string(),
            description: None,
            status: PhaseStatus::Pending,
            sort_order,
        })
        .unwrap()
    }

    fn depends(db: &Database, phase: &Phase, on: &Phase) -> PhaseDependency {
        db.insert_dependency(&NewDependency {
            phase_id: phase.id.clone(),
            depends_on_phase_id: on.id.clone(),
            dependency_type: DEFAULT_DEPENDENCY_TYPE.to_string(),
            notes: None,
        })
        .unwrap()
    }

    #[test]
    fn test_database_creation() {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path()).unwrap();

        assert!(db.list_projects().unwrap().is_empty());
        assert!(db.list_phases_with_deps().unwrap().is_empty());

        // Reopening keeps the schema idempotent
        drop(db);
        let reopened = Database::new(temp.path()).unwrap();
        assert!(reopened.list_tradelines(None).unwrap().is_empty());
    }

    #[test]
    fn test_blocking_view() {
        let db = Database::open_in_memory().unwrap();
        let project = seed_project(&db, "Portal", "portal");
        let schema = seed_phase(&db, &project, "Schema", 0);
        let api = seed_phase(&db, &project, "API", 1);
        let ui = seed_phase(&db, &project, "UI", 2);

        depends(&db, &api, &schema);
        depends(&db, &ui, &schema);
        depends(&db, &ui, &api);

        let phases = db.list_phases_with_deps().unwrap();
        let by_name = |name: &str| phases.iter().find(|p| p.phase.name == name).unwrap();

        assert!(!by_name("Schema").is_blocked);
        assert!(by_name("API").is_blocked);
        assert_eq!(by_name("UI").blocking_deps_count, 2);
        assert!(by_name("UI").is_waiting_on(&schema.id));
        assert_eq!(by_name("API").project_slug, "portal");

        // Finishing the schema unblocks the API but the UI still waits on it
        db.complete_phase(&schema.id, &now_timestamp()).unwrap();
        let phases = db.list_phases_with_deps().unwrap();
        let api_view = phases.iter().find(|p| p.phase.id == api.id).unwrap();
        let ui_view = phases.iter().find(|p| p.phase.id == ui.id).unwrap();
        assert!(!api_view.is_blocked);
        assert_eq!(ui_view.blocking_phase_ids, vec![api.id.clone()]);
    }

    #[test]
    fn test_self_dependency_rejected() {
        let db = Database::open_in_memory().unwrap();
        let project = seed_project(&db, "Core", "core");
        let phase = seed_phase(&db, &project, "Bootstrap", 0);

        let err = db
            .insert_dependency(&NewDependency {
                phase_id: phase.id.clone(),
                depends_on_phase_id: phase.id.clone(),
                dependency_type: DEFAULT_DEPENDENCY_TYPE.to_string(),
                notes: None,
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::Validation(_)));
        assert!(db.list_dependencies(&phase.id).unwrap().is_empty());
    }

    #[test]
    fn test_dependency_requires_existing_phases() {
        let db = Database::open_in_memory().unwrap();
        let project = seed_project(&db, "Core", "core");
        let phase = seed_phase(&db, &project, "Bootstrap", 0);

        let err = db
            .insert_dependency(&NewDependency {
                phase_id: phase.id.clone(),
                depends_on_phase_id: PhaseId::from("phase_missing"),
                dependency_type: DEFAULT_DEPENDENCY_TYPE.to_string(),
                notes: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "phase", .. }));
    }

    #[test]
    fn test_dependency_details_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let core = seed_project(&db, "Core", "core");
        let portal = seed_project(&db, "Portal", "portal");
        let auth = seed_phase(&db, &core, "Auth service", 0);
        let login = seed_phase(&db, &portal, "Login page", 0);

        let dep = depends(&db, &login, &auth);
        let details = db.list_dependencies(&login.id).unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].depends_on.name, "Auth service");
        assert_eq!(details[0].depends_on.project_slug, "core");

        assert!(db.delete_dependency(&dep.id).unwrap());
        assert!(!db.delete_dependency(&dep.id).unwrap());
        assert!(db.list_dependencies(&login.id).unwrap().is_empty());
    }

    #[test]
    fn test_start_phase_keeps_first_start() {
        let db = Database::open_in_memory().unwrap();
        let project = seed_project(&db, "Engine", "engine");
        let phase = seed_phase(&db, &project, "Indexer", 0);

        let started = db.start_phase(&phase.id, "2025-01-01T00:00:00.000000Z").unwrap();
        assert_eq!(started.status, PhaseStatus::InProgress);

        let restarted = db.start_phase(&phase.id, "2025-02-01T00:00:00.000000Z").unwrap();
        assert_eq!(
            restarted.started_at.as_deref(),
            Some("2025-01-01T00:00:00.000000Z")
        );
        assert_eq!(restarted.updated_at, "2025-02-01T00:00:00.000000Z");
    }

    #[test]
    fn test_complete_phase_retires_focus() {
        let db = Database::open_in_memory().unwrap();
        let project = seed_project(&db, "Engine", "engine");
        let phase = seed_phase(&db, &project, "Indexer", 0);

        db.insert_focus(&NewFocus {
            project_id: project.id.clone(),
            phase_id: phase.id.clone(),
            priority: 1,
            rationale: "Ship the indexer".to_string(),
            set_by: "user".to_string(),
        })
        .unwrap();
        assert_eq!(db.active_focus(None).unwrap().len(), 1);

        let completed = db.complete_phase(&phase.id, &now_timestamp()).unwrap();
        assert_eq!(completed.status, PhaseStatus::Complete);
        assert!(completed.completed_at.is_some());
        assert!(db.active_focus(None).unwrap().is_empty());

        let missing = db.complete_phase(&PhaseId::from("phase_missing"), &now_timestamp());
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_update_phase_partial() {
        let db = Database::open_in_memory().unwrap();
        let project = seed_project(&db, "Sources", "sources");
        let phase = seed_phase(&db, &project, "Crawler", 3);

        let patch = PhasePatch {
            description: Some("Nightly crawl".to_string()),
            sort_order: Some(1),
            ..Default::default()
        };
        let updated = db.update_phase(&phase.id, &patch, &now_timestamp()).unwrap();

        assert_eq!(updated.name, "Crawler");
        assert_eq!(updated.description.as_deref(), Some("Nightly crawl"));
        assert_eq!(updated.sort_order, 1);
        assert_eq!(updated.status, PhaseStatus::Pending);

        let missing = db.update_phase(&PhaseId::from("phase_nope"), &patch, &now_timestamp());
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_update_phase_to_complete_retires_focus() {
        let db = Database::open_in_memory().unwrap();
        let project = seed_project(&db, "Engine", "engine");
        let phase = seed_phase(&db, &project, "Indexer", 0);
        db.insert_focus(&NewFocus {
            project_id: project.id.clone(),
            phase_id: phase.id.clone(),
            priority: 1,
            rationale: "Ship the indexer".to_string(),
            set_by: "user".to_string(),
        })
        .unwrap();

        let patch = PhasePatch {
            status: Some(PhaseStatus::Complete),
            description: Some("Shipped".to_string()),
            completed_at: Some("2025-03-01T00:00:00.000000Z".to_string()),
            ..Default::default()
        };
        let updated = db.update_phase(&phase.id, &patch, &now_timestamp()).unwrap();

        assert_eq!(updated.status, PhaseStatus::Complete);
        assert_eq!(updated.description.as_deref(), Some("Shipped"));
        assert_eq!(
            updated.completed_at.as_deref(),
            Some("2025-03-01T00:00:00.000000Z")
        );
        assert!(db.active_focus(None).unwrap().is_empty());

        let retired_at: Option<String> = db
            .lock()
            .unwrap()
            .query_row(
                "SELECT completed_at FROM current_focus WHERE phase_id = ?1",
                params![phase.id.0],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(retired_at.as_deref(), Some("2025-03-01T00:00:00.000000Z"));
    }

    #[test]
    fn test_recently_completed_window() {
        let db = Database::open_in_memory().unwrap();
        let project = seed_project(&db, "Portal", "portal");
        let old = seed_phase(&db, &project, "Old", 0);
        let fresh = seed_phase(&db, &project, "Fresh", 1);

        db.complete_phase(&old.id, "2024-01-01T00:00:00.000000Z").unwrap();
        db.complete_phase(&fresh.id, "2025-06-10T00:00:00.000000Z").unwrap();

        let recent = db
            .recently_completed_phases("2025-06-03T00:00:00.000000Z", 5)
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].phase.name, "Fresh");
        assert_eq!(recent[0].project_name, "Portal");
    }

    #[test]
    fn test_project_paths_and_todos() {
        let db = Database::open_in_memory().unwrap();
        let project = seed_project(&db, "Portal", "portal");
        db.add_project_path(&project.id, "/srv/portal").unwrap();
        db.add_project_path(&project.id, "/srv/portal").unwrap();
        db.add_project_path(&project.id, "/srv/portal-admin").unwrap();

        assert_eq!(
            db.list_project_paths(&project.id).unwrap(),
            vec!["/srv/portal".to_string(), "/srv/portal-admin".to_string()]
        );

        let err = db.add_project_path(&ProjectId::from("proj_missing"), "/tmp");
        assert!(matches!(err, Err(StoreError::NotFound { .. })));

        db.insert_todo(&NewTodo {
            project_path: "/srv/portal".to_string(),
            title: "Add SSO".to_string(),
            description: None,
            priority: Some("High".to_string()),
            status: "pending".to_string(),
            category: None,
        })
        .unwrap();

        let todos = db.todos_for_path("/srv/portal").unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].priority_level(), Some(TodoPriority::High));
        assert!(db.todos_for_path("/srv/portal-admin").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let db = Database::open_in_memory().unwrap();
        seed_project(&db, "Portal", "portal");
        let err = db.insert_project(&NewProject::new("Portal v2", "portal"));
        assert!(matches!(err, Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_priority_analysis_is_append_only() {
        let db = Database::open_in_memory().unwrap();
        let todo = db
            .insert_todo(&NewTodo {
                project_path: "/srv/core".to_string(),
                title: "Extract auth client".to_string(),
                description: None,
                priority: Some("low".to_string()),
                status: "pending".to_string(),
                category: None,
            })
            .unwrap();

        let entry = |content: &str| NewKnowledgeEntry {
            project_path: "/srv/ai-team".to_string(),
            title: "Cross-Project Priority Analysis".to_string(),
            content: content.to_string(),
            category: "Roadmap".to_string(),
            source: "ryan_prioritizer".to_string(),
        };

        let (_, updated) = db
            .record_priority_analysis(
                &entry("{\"run\": 1}"),
                &[
                    (todo.id.clone(), TodoPriority::High),
                    (TodoId::from("todo_unknown"), TodoPriority::Low),
                ],
            )
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(
            db.get_todo(&todo.id).unwrap().unwrap().priority.as_deref(),
            Some("high")
        );

        db.record_priority_analysis(&entry("{\"run\": 2}"), &[]).unwrap();

        let latest = db
            .latest_knowledge_entry("Roadmap", "ryan_prioritizer")
            .unwrap()
            .unwrap();
        assert_eq!(latest.content, "{\"run\": 2}");
        assert!(db
            .latest_knowledge_entry("Roadmap", "someone_else")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_tradeline_runs_use_counters() {
        let db = Database::open_in_memory().unwrap();
        let tradeline = db
            .insert_tradeline(&NewTradeline {
                name: "Permit scraper".to_string(),
                slug: "permits".to_string(),
                status: TradelineStatus::Testing,
                port_number: Some(5501),
                server_path: None,
                droplet_ip: None,
                notes: None,
            })
            .unwrap();

        let ok = db
            .record_tradeline_run(
                &tradeline.id,
                &TradelineRun {
                    discoveries: Some(7),
                    error: None,
                },
                &now_timestamp(),
            )
            .unwrap();
        assert_eq!(ok.discovery_count, 7);
        assert!(ok.last_success_at.is_some());

        let failed = db
            .record_tradeline_run(
                &tradeline.id,
                &TradelineRun {
                    discoveries: Some(3),
                    error: Some("timeout".to_string()),
                },
                &now_timestamp(),
            )
            .unwrap();
        assert_eq!(failed.error_count, 1);
        assert_eq!(failed.discovery_count, 7);
        assert_eq!(failed.last_error.as_deref(), Some("timeout"));

        db.increment(CounterField::TradelineDiscoveryCount, &tradeline.id.0, 5)
            .unwrap();
        let reloaded = db.get_tradeline(&tradeline.id).unwrap().unwrap();
        assert_eq!(reloaded.discovery_count, 12);

        let missing = db.increment(CounterField::TradelineErrorCount, "tl_missing", 1);
        assert!(matches!(
            missing,
            Err(StoreError::NotFound {
                entity: "tradeline",
                ..
            })
        ));

        let testing = db.list_tradelines(Some(TradelineStatus::Testing)).unwrap();
        assert_eq!(testing.len(), 1);
        assert!(db.list_tradelines(Some(TradelineStatus::Live)).unwrap().is_empty());
    }

    #[test]
    fn test_active_bugs_filter() {
        let db = Database::open_in_memory().unwrap();
        let bug = |title: &str, severity: Severity, status: &str| NewBug {
            title: title.to_string(),
            severity,
            status: status.to_string(),
            project_path: Some("/srv/portal".to_string()),
        };

        db.insert_bug(&bug("Login loops", Severity::Critical, "open")).unwrap();
        db.insert_bug(&bug("Slow search", Severity::High, "investigating")).unwrap();
        db.insert_bug(&bug("Old crash", Severity::Critical, "resolved")).unwrap();
        db.insert_bug(&bug("Typo", Severity::Low, "open")).unwrap();

        let critical = db.list_active_bugs(&[Severity::Critical], None).unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].title, "Login loops");

        let urgent = db
            .list_active_bugs(&[Severity::Critical, Severity::High], Some(10))
            .unwrap();
        assert_eq!(urgent.len(), 2);
    }

    #[test]
    fn test_usage_records() {
        let db = Database::open_in_memory().unwrap();
        db.insert_usage(&UsageRecord {
            model: "gpt-4o-mini".to_string(),
            input_tokens: 1200,
            output_tokens: 300,
            cost_usd: 0.00036,
            task_type: Some("cross_project_prioritization".to_string()),
            assistant_name: "ryan".to_string(),
            prompt_preview: Some("Analyze these".to_string()),
        })
        .unwrap();

        let usage = db.recent_usage(10).unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].input_tokens, 1200);
        assert_eq!(usage[0].assistant_name, "ryan");
    }
}

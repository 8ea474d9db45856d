use ryan_schemas::{NewProject, Project, ProjectId};
use ryan_store::Store;
use std::sync::Arc;
use tracing::info;

use crate::error::{required, PlannerError, Result};

/// Fields accepted when registering a project
#[derive(Debug, Clone, Default)]
pub struct ProjectDraft {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub parent_id: Option<ProjectId>,
    pub client_id: Option<String>,
    pub is_parent: Option<bool>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i64>,
}

pub struct ProjectService {
    store: Arc<dyn Store>,
}

impl ProjectService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Project>> {
        Ok(self.store.list_projects()?)
    }

    pub fn create(&self, draft: ProjectDraft) -> Result<Project> {
        let message = "name and slug are required";
        let name = required(draft.name, message)?;
        let slug = required(draft.slug, message)?;

        if let Some(parent_id) = &draft.parent_id {
            if self.store.get_project(parent_id)?.is_none() {
                return Err(PlannerError::not_found("project", parent_id));
            }
        }

        let mut project = NewProject::new(name, slug);
        project.parent_id = draft.parent_id;
        project.client_id = draft.client_id;
        project.is_parent = draft.is_parent.unwrap_or(false);
        project.is_active = draft.is_active.unwrap_or(true);
        project.sort_order = draft.sort_order.unwrap_or(0);

        let project = self.store.insert_project(&project)?;
        info!("Created project: {} ({})", project.slug, project.id);
        Ok(project)
    }

    /// Todos are keyed by path, so a project only sees todos under its registered paths
    pub fn add_path(&self, project_id: &ProjectId, path: Option<String>) -> Result<Vec<String>> {
        let path = required(path, "path is required")?;
        if self.store.get_project(project_id)?.is_none() {
            return Err(PlannerError::not_found("project", project_id));
        }

        self.store.add_project_path(project_id, path.trim())?;
        Ok(self.store.list_project_paths(project_id)?)
    }
}

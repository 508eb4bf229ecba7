use crate::clock::Clock;
use crate::entities::{history_entry, project};
use chrono::{DateTime, Utc};
use sea_orm::*;

pub use crate::entities::sea_orm_active_enums::ProjectStatus;

pub mod web;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Project {
    id: u32,
    name: String,
    description: String,
    status: ProjectStatus,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    archived: bool,
}

impl Project {
    /// Returns the ID of the project.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> ProjectStatus {
        self.status
    }

    /// When the project first moved to in-progress, if it ever did.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the project last moved to completed, if it ever did.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }
}

impl From<project::Model> for Project {
    fn from(model: project::Model) -> Self {
        Self {
            id: model.id as u32,
            name: model.name,
            description: model.description,
            status: model.status,
            started_at: model.started_at,
            completed_at: model.completed_at,
            archived: model.archived,
        }
    }
}

/// One recorded status of a project.
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct HistoryEntry {
    id: u32,
    project_id: u32,
    status: ProjectStatus,
    recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn project_id(&self) -> u32 {
        self.project_id
    }

    pub fn status(&self) -> ProjectStatus {
        self.status
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

impl From<history_entry::Model> for HistoryEntry {
    fn from(model: history_entry::Model) -> Self {
        Self {
            id: model.id as u32,
            project_id: model.project_id as u32,
            status: model.status,
            recorded_at: model.recorded_at,
        }
    }
}

/// Non-archived projects split by column.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Board {
    pub pending: Vec<Project>,
    pub in_progress: Vec<Project>,
    pub completed: Vec<Project>,
}

/// Error type for ProjectService operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectServiceError {
    /// Represents a project not found error.
    #[error("Project with ID {0} not found")]
    ProjectNotFound(u32),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub struct ProjectService<'a> {
    db: &'a DatabaseConnection,
    clock: &'a dyn Clock,
}

impl<'a> ProjectService<'a> {
    pub fn new(db: &'a DatabaseConnection, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    /// Creates a pending project and records its first history entry.
    ///
    /// The project and the history entry are two separate writes. If the
    /// second one fails the project is left without history.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the project.
    /// * `description` - Free text describing the project.
    #[tracing::instrument(skip(self))]
    pub async fn create_project(
        &self,
        name: String,
        description: String,
    ) -> Result<Project, ProjectServiceError> {
        let active_model = project::ActiveModel {
            name: ActiveValue::Set(name),
            description: ActiveValue::Set(description),
            status: ActiveValue::Set(ProjectStatus::Pending),
            archived: ActiveValue::Set(false),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;

        record_history(
            self.db,
            created_model.id,
            ProjectStatus::Pending,
            self.clock.now(),
        )
        .await?;

        tracing::info!("Created project {}", created_model.id);
        Ok(Project::from(created_model))
    }

    /// Retrieves every non-archived project grouped by status, each column ordered by ID.
    #[tracing::instrument(skip(self))]
    pub async fn list_board(&self) -> Result<Board, ProjectServiceError> {
        let models = project::Entity::find()
            .filter(project::Column::Archived.eq(false))
            .order_by_asc(project::Column::Id)
            .all(self.db)
            .await?;

        let mut board = Board::default();
        for model in models {
            let column = match model.status {
                ProjectStatus::Pending => &mut board.pending,
                ProjectStatus::InProgress => &mut board.in_progress,
                ProjectStatus::Completed => &mut board.completed,
            };
            column.push(Project::from(model));
        }
        Ok(board)
    }

    /// Retrieves a project by its ID.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Project`, or `ProjectNotFound` if no project has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_project(&self, id: u32) -> Result<Project, ProjectServiceError> {
        let model = find_project(self.db, id).await?;
        Ok(Project::from(model))
    }

    /// Retrieves the status history of a project, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn project_history(
        &self,
        id: u32,
    ) -> Result<Vec<HistoryEntry>, ProjectServiceError> {
        let model = find_project(self.db, id).await?;
        let entries = history_entry::Entity::find()
            .filter(history_entry::Column::ProjectId.eq(model.id))
            .order_by_asc(history_entry::Column::RecordedAt)
            .order_by_asc(history_entry::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .map(HistoryEntry::from)
            .collect();
        Ok(entries)
    }

    /// Moves a project to `status` and appends a history entry for it.
    ///
    /// The first move into in-progress stamps `started_at`. Every move into
    /// completed stamps `completed_at`. Stamps are never cleared.
    #[tracing::instrument(skip(self))]
    pub async fn move_project(
        &self,
        id: u32,
        status: ProjectStatus,
    ) -> Result<Project, ProjectServiceError> {
        let txn = self.db.begin().await?;
        let model = find_project(&txn, id).await?;
        let now = self.clock.now();

        let mut active_model: project::ActiveModel = model.clone().into();
        match status {
            ProjectStatus::InProgress if model.started_at.is_none() => {
                active_model.started_at = ActiveValue::Set(Some(now));
            }
            ProjectStatus::Completed => {
                active_model.completed_at = ActiveValue::Set(Some(now));
            }
            _ => {}
        }
        active_model.status = ActiveValue::Set(status);
        let updated_model = active_model.update(&txn).await?;

        record_history(&txn, updated_model.id, status, now).await?;
        txn.commit().await?;

        tracing::info!("Moved project {} from {} to {}", id, model.status, status);
        Ok(Project::from(updated_model))
    }

    /// Overwrites the name and description of a project. No history is recorded.
    #[tracing::instrument(skip(self))]
    pub async fn edit_project(
        &self,
        id: u32,
        new_name: String,
        new_description: String,
    ) -> Result<Project, ProjectServiceError> {
        let project_to_update = find_project(self.db, id).await?;

        let mut active_model: project::ActiveModel = project_to_update.into();
        active_model.name = ActiveValue::Set(new_name);
        active_model.description = ActiveValue::Set(new_description);
        let updated_model = active_model.update(self.db).await?;

        Ok(Project::from(updated_model))
    }

    /// Deletes a project together with its history.
    ///
    /// # Returns
    ///
    /// A `Result` containing the deleted `Project` if successful, or an error otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn delete_project(&self, id: u32) -> Result<Project, ProjectServiceError> {
        let txn = self.db.begin().await?;
        let project_to_delete = find_project(&txn, id).await?;

        let removed_entries = history_entry::Entity::delete_many()
            .filter(history_entry::Column::ProjectId.eq(project_to_delete.id))
            .exec(&txn)
            .await?;
        project::Entity::delete_by_id(project_to_delete.id)
            .exec(&txn)
            .await?;
        txn.commit().await?;

        tracing::info!(
            "Deleted project {} and {} history entries",
            id,
            removed_entries.rows_affected
        );
        Ok(Project::from(project_to_delete))
    }

    /// Sets the archived flag of a project. Status and history are left alone.
    #[tracing::instrument(skip(self))]
    pub async fn set_archived(
        &self,
        id: u32,
        archived: bool,
    ) -> Result<Project, ProjectServiceError> {
        let project_to_update = find_project(self.db, id).await?;

        let mut active_model: project::ActiveModel = project_to_update.into();
        active_model.archived = ActiveValue::Set(archived);
        let updated_model = active_model.update(self.db).await?;

        Ok(Project::from(updated_model))
    }

    /// Retrieves archived projects, optionally only those whose name contains `term`.
    ///
    /// The match ignores case, with Unicode case folding applied to both the
    /// name and the term. An empty term behaves like no term.
    #[tracing::instrument(skip(self))]
    pub async fn list_archived(
        &self,
        term: Option<&str>,
    ) -> Result<Vec<Project>, ProjectServiceError> {
        let models = project::Entity::find()
            .filter(project::Column::Archived.eq(true))
            .order_by_asc(project::Column::Id)
            .all(self.db)
            .await?;

        let needle = term.filter(|term| !term.is_empty()).map(str::to_lowercase);
        let projects = models
            .into_iter()
            .filter(|model| match &needle {
                Some(needle) => model.name.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .map(Project::from)
            .collect();
        Ok(projects)
    }
}

async fn record_history<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
    status: ProjectStatus,
    recorded_at: DateTime<Utc>,
) -> Result<(), ProjectServiceError> {
    history_entry::ActiveModel {
        project_id: ActiveValue::Set(project_id),
        status: ActiveValue::Set(status),
        recorded_at: ActiveValue::Set(recorded_at),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

async fn find_project<C: ConnectionTrait>(
    conn: &C,
    id: u32,
) -> Result<project::Model, ProjectServiceError> {
    let Ok(key) = i32::try_from(id) else {
        return Err(ProjectServiceError::ProjectNotFound(id));
    };
    project::Entity::find_by_id(key)
        .one(conn)
        .await?
        .ok_or(ProjectServiceError::ProjectNotFound(id))
}

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Local, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::clock::Clock;
use crate::project::{HistoryEntry, Project, ProjectService, ProjectServiceError, ProjectStatus};

/// Form submitted when creating or editing a project.
#[derive(Debug, Deserialize)]
pub struct ProjectForm {
    #[serde(rename = "nome")]
    name: String,
    #[serde(rename = "descricao")]
    description: String,
}

#[derive(Debug, Deserialize)]
pub struct ArchivedQuery {
    busca: Option<String>,
}

/// A `302 Found` redirect, sent after every mutation.
#[derive(Debug)]
pub struct Found(String);

impl Found {
    pub fn to(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }
}

impl IntoResponse for Found {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(header::LOCATION, self.0)]).into_response()
    }
}

/// Formats a stored UTC instant in the server's local time zone.
pub fn local_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

/// Custom error type for board handler operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Represents an error during template rendering.
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    /// Represents a project service error.
    #[error("Project service error")]
    Service(#[from] ProjectServiceError),
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        let rendered = match self {
            BoardError::Service(ProjectServiceError::ProjectNotFound(id)) => {
                tracing::warn!("Project {} not found", id);
                NotFoundTemplate::new(id)
                    .render()
                    .map(|html| (StatusCode::NOT_FOUND, html))
            }
            err => {
                tracing::error!("Board request failed: {:?}", err);
                ErrorTemplate
                    .render()
                    .map(|html| (StatusCode::INTERNAL_SERVER_ERROR, html))
            }
        };

        let Ok((status_code, html)) = rendered else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        (status_code, Html(html)).into_response()
    }
}

#[derive(Template)]
#[template(path = "board.html")]
struct BoardTemplate {
    pending: Vec<Project>,
    in_progress: Vec<Project>,
    completed: Vec<Project>,
}

#[derive(Template)]
#[template(path = "project.html")]
struct ProjectTemplate {
    started_at: Option<String>,
    completed_at: Option<String>,
    history: Vec<HistoryRow>,
    project: Project,
}

struct HistoryRow {
    status: ProjectStatus,
    recorded_at: String,
}

impl ProjectTemplate {
    pub fn new(project: Project, history: Vec<HistoryEntry>) -> Self {
        let history = history
            .into_iter()
            .map(|entry| HistoryRow {
                status: entry.status(),
                recorded_at: local_timestamp(entry.recorded_at()),
            })
            .collect();
        Self {
            started_at: project.started_at().map(local_timestamp),
            completed_at: project.completed_at().map(local_timestamp),
            history,
            project,
        }
    }
}

#[derive(Template)]
#[template(path = "edit_project.html")]
struct EditProjectTemplate {
    project: Project,
}

#[derive(Template)]
#[template(path = "archived.html")]
struct ArchivedTemplate {
    projects: Vec<Project>,
    search: String,
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate {
    id: u32,
}

impl NotFoundTemplate {
    pub fn new(id: u32) -> Self {
        Self { id }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate;

/// Everything the board handlers need: the store and the clock.
#[derive(Clone)]
pub struct BoardState {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub clock: Arc<dyn Clock>,
}

impl BoardState {
    fn project_service(&self) -> ProjectService<'_> {
        ProjectService::new(&self.db, self.clock.as_ref())
    }
}

/// Handler for GET / that renders the three board columns.
#[tracing::instrument(skip(state))]
async fn board_handler(
    State(state): State<Arc<BoardState>>,
) -> Result<Html<String>, BoardError> {
    let board = state.project_service().list_board().await?;
    let template = BoardTemplate {
        pending: board.pending,
        in_progress: board.in_progress,
        completed: board.completed,
    };
    template.render().map(Html).map_err(BoardError::from)
}

/// Handler for POST /criar_projeto.
#[tracing::instrument(skip(state))]
async fn create_project_handler(
    State(state): State<Arc<BoardState>>,
    Form(form): Form<ProjectForm>,
) -> Result<Found, BoardError> {
    state
        .project_service()
        .create_project(form.name, form.description)
        .await?;
    Ok(Found::to("/"))
}

/// Handler for GET /mover_projeto/{id}/{novo_status}.
#[tracing::instrument(skip(state))]
async fn move_project_handler(
    State(state): State<Arc<BoardState>>,
    Path((id, status)): Path<(u32, ProjectStatus)>,
) -> Result<Found, BoardError> {
    state.project_service().move_project(id, status).await?;
    Ok(Found::to("/"))
}

/// Handler for GET /projeto/{id} showing the project and its history.
#[tracing::instrument(skip(state))]
async fn project_handler(
    State(state): State<Arc<BoardState>>,
    Path(id): Path<u32>,
) -> Result<Html<String>, BoardError> {
    let project_service = state.project_service();
    let project = project_service.get_project(id).await?;
    let history = project_service.project_history(id).await?;
    let template = ProjectTemplate::new(project, history);
    template.render().map(Html).map_err(BoardError::from)
}

/// Handler for serving the edit project form.
#[tracing::instrument(skip(state))]
async fn edit_project_form_handler(
    State(state): State<Arc<BoardState>>,
    Path(id): Path<u32>,
) -> Result<Html<String>, BoardError> {
    let project = state.project_service().get_project(id).await?;
    let template = EditProjectTemplate { project };
    template.render().map(Html).map_err(BoardError::from)
}

/// Handler for POST /projeto/{id}/editar.
#[tracing::instrument(skip(state))]
async fn update_project_handler(
    State(state): State<Arc<BoardState>>,
    Path(id): Path<u32>,
    Form(form): Form<ProjectForm>,
) -> Result<Found, BoardError> {
    let project = state
        .project_service()
        .edit_project(id, form.name, form.description)
        .await?;
    Ok(Found::to(format!("/projeto/{}", project.id())))
}

#[tracing::instrument(skip(state))]
async fn delete_project_handler(
    State(state): State<Arc<BoardState>>,
    Path(id): Path<u32>,
) -> Result<Found, BoardError> {
    state.project_service().delete_project(id).await?;
    Ok(Found::to("/"))
}

#[tracing::instrument(skip(state))]
async fn archive_project_handler(
    State(state): State<Arc<BoardState>>,
    Path(id): Path<u32>,
) -> Result<Found, BoardError> {
    state.project_service().set_archived(id, true).await?;
    Ok(Found::to("/"))
}

#[tracing::instrument(skip(state))]
async fn unarchive_project_handler(
    State(state): State<Arc<BoardState>>,
    Path(id): Path<u32>,
) -> Result<Found, BoardError> {
    state.project_service().set_archived(id, false).await?;
    Ok(Found::to("/arquivados"))
}

/// Handler for GET /arquivados, filtered by the optional `busca` term.
#[tracing::instrument(skip(state))]
async fn archived_handler(
    State(state): State<Arc<BoardState>>,
    Query(query): Query<ArchivedQuery>,
) -> Result<Html<String>, BoardError> {
    let search = query.busca.unwrap_or_default();
    let projects = state
        .project_service()
        .list_archived(Some(search.as_str()))
        .await?;
    let template = ArchivedTemplate { projects, search };
    template.render().map(Html).map_err(BoardError::from)
}

/// Creates and returns the board router with all project routes.
///
/// Mutations other than create and edit are plain GET links.
pub fn create_board_router(state: Arc<BoardState>) -> Router {
    Router::new()
        .route("/", get(board_handler))
        .route("/criar_projeto", post(create_project_handler))
        .route("/mover_projeto/{id}/{novo_status}", get(move_project_handler))
        .route("/projeto/{id}", get(project_handler))
        .route(
            "/projeto/{id}/editar",
            get(edit_project_form_handler).post(update_project_handler),
        )
        .route("/projeto/{id}/excluir", get(delete_project_handler))
        .route("/projeto/{id}/arquivar", get(archive_project_handler))
        .route("/projeto/{id}/desarquivar", get(unarchive_project_handler))
        .route("/arquivados", get(archived_handler))
        .with_state(state)
}

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use chrono::Duration;
use kanban_server::project::web::{BoardState, local_timestamp};
use kanban_server::project::{ProjectService, ProjectStatus};
use kanban_server::web::create_app;
use std::sync::Arc;
use tower::ServiceExt;

mod common;

use common::{TestContext, setup, start_time};

fn create_test_app(state: &TestContext) -> Router {
    create_app(Arc::new(BoardState {
        db: state.db.clone(),
        clock: state.clock.clone(),
    }))
}

fn service(state: &TestContext) -> ProjectService<'_> {
    ProjectService::new(&state.db, state.clock.as_ref())
}

async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn post_form(app: &Router, uri: &str, form_data: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form_data.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Returns the part of the board page that belongs to the column with `column_id`.
fn board_column<'a>(html: &'a str, column_id: &str) -> &'a str {
    let marker = format!("id=\"{}\"", column_id);
    let start = html.find(&marker).expect("Column not rendered");
    let rest = &html[start..];
    let end = rest.find("</section>").unwrap_or(rest.len());
    &rest[..end]
}

#[tokio::test]
async fn can_render_empty_board() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);

    let response = get(&app, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
    assert_eq!(
        content_type.as_ref().and_then(|value| value.to_str().ok()),
        Some("text/html; charset=utf-8")
    );
    let html = body_text(response).await;
    assert!(html.contains("Nenhum projeto pendente."));
    assert!(html.contains("Nenhum projeto em andamento."));
    assert!(html.contains("Nenhum projeto concluído."));
}

#[tokio::test]
async fn can_create_project_from_form_and_redirect_to_board() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);

    let response = post_form(&app, "/criar_projeto", "nome=Site%20novo&descricao=x").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let project = service(&state)
        .get_project(1)
        .await
        .expect("Project was not created");
    assert_eq!(project.name(), "Site novo");
    assert_eq!(project.status(), ProjectStatus::Pending);

    let html = body_text(get(&app, "/").await).await;
    assert!(board_column(&html, "pendente").contains("Site novo"));
}

#[tokio::test]
async fn rejects_create_form_with_missing_field() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);

    let response = post_form(&app, "/criar_projeto", "nome=Sem%20descricao").await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let board = service(&state).list_board().await.expect("Failed to load board");
    assert!(board.pending.is_empty());
}

#[tokio::test]
async fn can_move_project_between_columns() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);
    service(&state)
        .create_project("Site".to_string(), "x".to_string())
        .await
        .expect("Failed to create project");

    state.clock.advance(Duration::minutes(5));
    let response = get(&app, "/mover_projeto/1/andamento").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let html = body_text(get(&app, "/").await).await;
    assert!(board_column(&html, "andamento").contains("Site"));
    assert!(!board_column(&html, "pendente").contains("Site"));

    let response = get(&app, "/mover_projeto/1/concluido").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let html = body_text(get(&app, "/").await).await;
    assert!(board_column(&html, "concluido").contains("Site"));
}

#[tokio::test]
async fn rejects_unknown_target_status() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);
    service(&state)
        .create_project("Site".to_string(), "x".to_string())
        .await
        .expect("Failed to create project");

    let response = get(&app, "/mover_projeto/1/arquivado").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let history = service(&state)
        .project_history(1)
        .await
        .expect("Failed to load history");
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn returns_not_found_page_for_unknown_project() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);

    for uri in [
        "/mover_projeto/999/andamento",
        "/projeto/999",
        "/projeto/999/editar",
        "/projeto/999/excluir",
        "/projeto/999/arquivar",
        "/projeto/999/desarquivar",
    ] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "GET {}", uri);
        let html = body_text(response).await;
        assert!(html.contains("Not Found"), "GET {}", uri);
    }

    let response = post_form(&app, "/projeto/999/editar", "nome=a&descricao=b").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejects_non_numeric_project_id() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);

    let response = get(&app, "/projeto/abc").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn can_view_project_with_history() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);
    let project_service = service(&state);
    project_service
        .create_project("Site".to_string(), "Página da empresa".to_string())
        .await
        .expect("Failed to create project");
    state.clock.advance(Duration::minutes(30));
    project_service
        .move_project(1, ProjectStatus::InProgress)
        .await
        .expect("Failed to move project");

    let response = get(&app, "/projeto/1").await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Página da empresa"));
    assert!(html.contains("<td id=\"status\">Em andamento</td>"));
    let created_at = local_timestamp(start_time());
    let started_at = local_timestamp(start_time() + Duration::minutes(30));
    assert!(html.contains(&started_at));

    let history_start = html.find("id=\"historico\"").expect("History not rendered");
    let history = &html[history_start..];
    let pending_row = history.find(&format!("<td>Pendente</td><td>{}</td>", created_at));
    let started_row = history.find(&format!("<td>Em andamento</td><td>{}</td>", started_at));
    assert!(pending_row.is_some());
    assert!(started_row.is_some());
    assert!(pending_row < started_row);
}

#[tokio::test]
async fn escapes_project_fields_in_html() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);
    service(&state)
        .create_project("<script>alert(1)</script>".to_string(), "x".to_string())
        .await
        .expect("Failed to create project");

    let html = body_text(get(&app, "/").await).await;

    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[tokio::test]
async fn can_edit_project_through_form() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);
    service(&state)
        .create_project("Site".to_string(), "x".to_string())
        .await
        .expect("Failed to create project");

    let response = get(&app, "/projeto/1/editar").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("value=\"Site\""));
    assert!(html.contains("action=\"/projeto/1/editar\""));

    let response = post_form(&app, "/projeto/1/editar", "nome=Portal&descricao=y").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/projeto/1");

    let project = service(&state).get_project(1).await.expect("Project missing");
    assert_eq!(project.name(), "Portal");
    assert_eq!(project.description(), "y");
    let history = service(&state)
        .project_history(1)
        .await
        .expect("Failed to load history");
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn rejects_edit_form_with_missing_field() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);
    service(&state)
        .create_project("Site".to_string(), "x".to_string())
        .await
        .expect("Failed to create project");

    let response = post_form(&app, "/projeto/1/editar", "descricao=y").await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let project = service(&state).get_project(1).await.expect("Project missing");
    assert_eq!(project.name(), "Site");
}

#[tokio::test]
async fn can_delete_project_and_then_not_find_it() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);
    service(&state)
        .create_project("Site".to_string(), "x".to_string())
        .await
        .expect("Failed to create project");

    let response = get(&app, "/projeto/1/excluir").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let response = get(&app, "/projeto/1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn can_archive_and_unarchive_through_links() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);
    service(&state)
        .create_project("Site".to_string(), "x".to_string())
        .await
        .expect("Failed to create project");

    let response = get(&app, "/projeto/1/arquivar").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let board = body_text(get(&app, "/").await).await;
    assert!(!board.contains("/projeto/1\""));
    let archived = body_text(get(&app, "/arquivados").await).await;
    assert!(archived.contains("/projeto/1/desarquivar"));

    let response = get(&app, "/projeto/1/desarquivar").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/arquivados");

    let board = body_text(get(&app, "/").await).await;
    assert!(board_column(&board, "pendente").contains("/projeto/1\""));
    let archived = body_text(get(&app, "/arquivados").await).await;
    assert!(archived.contains("Nenhum projeto arquivado encontrado."));
}

#[tokio::test]
async fn can_search_archived_projects() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);
    let project_service = service(&state);
    for name in ["Site institucional", "Aplicativo", "Loja SITE"] {
        let created = project_service
            .create_project(name.to_string(), String::new())
            .await
            .expect("Failed to create project");
        project_service
            .set_archived(created.id(), true)
            .await
            .expect("Failed to archive project");
    }

    let response = get(&app, "/arquivados?busca=site").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Site institucional"));
    assert!(html.contains("Loja SITE"));
    assert!(!html.contains("Aplicativo"));
    assert!(html.contains("value=\"site\""));

    let html = body_text(get(&app, "/arquivados?busca=").await).await;
    assert!(html.contains("Site institucional"));
    assert!(html.contains("Aplicativo"));
    assert!(html.contains("Loja SITE"));
}

#[tokio::test]
async fn can_check_health_endpoint() {
    let state = setup().await.expect("Failed to setup test context");
    let app = create_test_app(&state);

    let response = get(&app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}

//! HTTP route handlers for the UI API.

use std::fs;
use std::path::Path as FsPath;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tracing::warn;

use devagent::core::language::language_for;
use devagent::core::path::PathEscapeError;
use devagent::io::project::{
    ARCHIVE_NAME, GeneratedFile, create_zip, list_generated_files, resolve_generated_file,
};

use crate::run::spawn_generation;
use crate::state::{AppState, RunStatus};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/status", get(status))
        .route("/files", get(list_files))
        .route("/files/{*path}", get(get_file))
        .route("/download/{*path}", get(download_file))
        .route("/archive", get(archive))
}

/// GET / - the embedded single-page UI.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    prompt: String,
}

/// POST /api/generate - start a run in the background.
async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<RunStatus>), (StatusCode, String)> {
    if req.prompt.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please enter a prompt first!".to_string(),
        ));
    }
    if !state.try_start_run() {
        return Err((
            StatusCode::CONFLICT,
            "A generation is already running.".to_string(),
        ));
    }
    spawn_generation(state, req.prompt);
    Ok((StatusCode::ACCEPTED, Json(RunStatus::Running)))
}

/// GET /api/status - state of the current or last run.
async fn status(State(state): State<AppState>) -> Json<RunStatus> {
    Json(state.status())
}

#[derive(Serialize)]
struct FilesResponse {
    files: Vec<GeneratedFile>,
}

/// GET /api/files - generated files sorted by path.
async fn list_files(State(state): State<AppState>) -> Result<Json<FilesResponse>, StatusCode> {
    let files = list_generated_files(&state.output_dir).map_err(internal)?;
    Ok(Json(FilesResponse { files }))
}

#[derive(Serialize)]
struct FileContent {
    path: String,
    language: Option<String>,
    content: String,
}

/// GET /api/files/{*path} - one file for the code viewer.
async fn get_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<FileContent>, StatusCode> {
    let resolved = resolve(&state.output_dir, &path)?;
    let bytes = fs::read(&resolved).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(FileContent {
        language: language_for(&resolved),
        content: String::from_utf8_lossy(&bytes).into_owned(),
        path,
    }))
}

/// GET /api/download/{*path} - raw file as an attachment.
async fn download_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, StatusCode> {
    let resolved = resolve(&state.output_dir, &path)?;
    let bytes = fs::read(&resolved).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let name = resolved
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download")
        .to_string();
    Ok(attachment("text/plain; charset=utf-8", &name, bytes))
}

/// GET /api/archive - every generated file as a zip.
async fn archive(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let files = list_generated_files(&state.output_dir).map_err(internal)?;
    if files.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    let bytes = create_zip(&state.output_dir).map_err(internal)?;
    Ok(attachment("application/zip", ARCHIVE_NAME, bytes))
}

fn attachment(content_type: &'static str, name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Map lookup failures: escapes are a bad request, anything else is missing.
fn resolve(root: &FsPath, rel: &str) -> Result<std::path::PathBuf, StatusCode> {
    resolve_generated_file(root, rel).map_err(|err| {
        if err.downcast_ref::<PathEscapeError>().is_some() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::NOT_FOUND
        }
    })
}

fn internal(err: anyhow::Error) -> StatusCode {
    warn!(error = %format!("{err:#}"), "request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use devagent::io::config::{AppConfig, ModelConfig};
    use devagent::io::model::{ChatModel, Message};
    use devagent::test_support::{ScriptedModel, json_reply, sample_plan, task_plan};

    use super::*;

    fn app(state: AppState) -> Router {
        crate::app(state, None)
    }

    fn state_with(temp: &tempfile::TempDir, replies: Vec<Message>) -> AppState {
        AppState::new(
            AppConfig::default(),
            temp.path().join("generated_project"),
            Arc::new(move |_: &ModelConfig| {
                Ok(Box::new(ScriptedModel::new(replies.clone())) as Box<dyn ChatModel + Send>)
            }),
        )
    }

    fn seeded(temp: &tempfile::TempDir) -> AppState {
        let state = state_with(temp, Vec::new());
        fs::create_dir_all(state.output_dir.join("css")).expect("mkdir");
        fs::write(state.output_dir.join("index.html"), "<h1>hi</h1>").expect("write");
        fs::write(state.output_dir.join("css/style.css"), "body {}").expect("write");
        state
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response")
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> Response {
        app.oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let temp = tempfile::tempdir().expect("tempdir");
        let response = get(app(seeded(&temp)), "/api/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn index_serves_embedded_page() {
        let temp = tempfile::tempdir().expect("tempdir");
        let response = get(app(seeded(&temp)), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Download ZIP"));
    }

    #[tokio::test]
    async fn files_are_listed_sorted_with_language() {
        let temp = tempfile::tempdir().expect("tempdir");
        let response = get(app(seeded(&temp)), "/api/files").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(
            json,
            json!({"files": [
                {"path": "css/style.css", "language": "css", "size": 7},
                {"path": "index.html", "language": "html", "size": 11},
            ]})
        );
    }

    #[tokio::test]
    async fn file_content_and_errors() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = seeded(&temp);

        let response = get(app(state.clone()), "/api/files/css/style.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"path": "css/style.css", "language": "css", "content": "body {}"})
        );

        let missing = get(app(state.clone()), "/api/files/missing.js").await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let escape = get(app(state), "/api/files/..%2F..%2Fetc%2Fpasswd").await;
        assert_eq!(escape.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn download_sets_attachment_header() {
        let temp = tempfile::tempdir().expect("tempdir");
        let response = get(app(seeded(&temp)), "/api/download/css/style.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"style.css\""
        );
        assert_eq!(body_text(response).await, "body {}");
    }

    #[tokio::test]
    async fn archive_is_a_zip() {
        let temp = tempfile::tempdir().expect("tempdir");
        let response = get(app(seeded(&temp)), "/api/archive").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"generated_project.zip\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert!(bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn archive_without_files_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let response = get(app(state_with(&temp, Vec::new())), "/api/archive").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generate_rejects_blank_prompt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let response = post_json(
            app(state_with(&temp, Vec::new())),
            "/api/generate",
            json!({"prompt": "  "}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Please enter a prompt first!");
    }

    #[tokio::test]
    async fn generate_conflicts_while_running() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = state_with(&temp, Vec::new());
        assert!(state.try_start_run());

        let response = post_json(app(state), "/api/generate", json!({"prompt": "todo"})).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn generate_runs_pipeline_to_completion() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = state_with(
            &temp,
            vec![
                json_reply(&sample_plan()),
                json_reply(&task_plan(&[])),
            ],
        );

        let response = post_json(
            app(state.clone()),
            "/api/generate",
            json!({"prompt": "Build a todo app"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await, json!({"state": "running"}));

        let mut last = state.status();
        for _ in 0..200 {
            if last != RunStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            last = state.status();
        }
        assert_eq!(last, RunStatus::Completed { steps: 0 });

        let response = get(app(state), "/api/status").await;
        assert_eq!(
            body_json(response).await,
            json!({"state": "completed", "steps": 0})
        );
    }
}

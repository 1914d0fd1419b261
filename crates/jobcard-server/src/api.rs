use std::sync::{Arc, Mutex};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use jobcard_shared::{decode, RawForm, UploadedFile};
use jobcard_store::{Database, JobCardDetail, ReconcileOptions, Target};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    /// Single writer: every request takes the connection in turn.
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/jobcards", get(list_job_cards).post(create_job_card))
        .route("/jobcards/:id", get(get_job_card))
        .route("/jobcards/:id/edit", post(edit_job_card))
        .route("/jobcards/:id/delete", post(delete_job_card))
        .route("/images/:id", get(image_download))
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Run blocking store work off the async runtime, holding the database lock.
async fn with_db<T, F>(state: &AppState, f: F) -> Result<T, ServerError>
where
    F: FnOnce(&mut Database) -> jobcard_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        let mut guard = db
            .lock()
            .map_err(|e| ServerError::Internal(format!("Lock poisoned: {e}")))?;
        f(&mut *guard).map_err(ServerError::from)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("Blocking task failed: {e}")))?
}

async fn list_job_cards(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobCardDetail>>, ServerError> {
    let job_cards = with_db(&state, |db| db.list_job_card_details()).await?;
    Ok(Json(job_cards))
}

async fn get_job_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobCardDetail>, ServerError> {
    let job_card = with_db(&state, move |db| db.job_card_detail(id)).await?;
    Ok(Json(job_card))
}

async fn create_job_card(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect, ServerError> {
    submit(&state, Target::Create, multipart).await
}

async fn edit_job_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Redirect, ServerError> {
    submit(&state, Target::Edit(id), multipart).await
}

/// Decode the form, reconcile it, and send the browser back to the list.
async fn submit(
    state: &AppState,
    target: Target,
    multipart: Multipart,
) -> Result<Redirect, ServerError> {
    let raw = read_form(multipart).await?;
    let submission = decode(raw)?;
    let options = ReconcileOptions {
        sweep_orphans: state.config.sweep_orphans,
    };

    let reconciled = with_db(state, move |db| db.reconcile(target, &submission, options)).await?;

    info!(
        job_card_id = %reconciled.job_card.job_card.id,
        complaints = reconciled.job_card.complaints.len(),
        "Job card saved via API"
    );

    Ok(Redirect::to("/jobcards"))
}

async fn read_form(mut multipart: Multipart) -> Result<RawForm, ServerError> {
    let mut form = RawForm::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {}", e)))?;
                form.push_file(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        data,
                    },
                );
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {}", e)))?;
                form.push_text(name, text);
            }
        }
    }

    Ok(form)
}

async fn delete_job_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<DeleteResponse>) {
    match with_db(&state, move |db| db.delete_job_card(id)).await {
        Ok(true) => (
            StatusCode::OK,
            Json(DeleteResponse {
                success: true,
                message: None,
            }),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(DeleteResponse {
                success: false,
                message: Some("Job card not found".to_string()),
            }),
        ),
        Err(e) => {
            tracing::error!(job_card_id = %id, error = %e, "Job card delete failed");
            (
                e.status(),
                Json(DeleteResponse {
                    success: false,
                    message: Some(e.public_message()),
                }),
            )
        }
    }
}

async fn image_download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServerError> {
    let (image, data) = with_db(&state, move |db| db.read_image(id)).await?;
    Ok(([(header::CONTENT_TYPE, image.content_type)], data).into_response())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use jobcard_store::ImageStore;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const BOUNDARY: &str = "jobcard-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn test_app() -> (Router, AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let images = ImageStore::new(dir.path().join("images"), 1024 * 1024).unwrap();
        let db = Database::open_at(&dir.path().join("test.db"), images).unwrap();
        let state = AppState {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(ServerConfig::default()),
        };
        (build_router(state.clone()), state, dir)
    }

    fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, file_name, data) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn base_parts() -> Vec<Part<'static>> {
        vec![
            Part::Text("customer", "Alice"),
            Part::Text("address", "1 Main St"),
            Part::Text("phone", "555-0100"),
            Part::Text("item", "Laptop"),
        ]
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(app, req).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn create_alice(app: &Router) -> Value {
        let mut parts = base_parts();
        parts.push(Part::Text("complaints[]", "won't power on"));
        parts.push(Part::Text("notes[]", ""));
        parts.push(Part::File("images[0][]", "imgA.png", PNG));

        let resp = app
            .clone()
            .oneshot(multipart_request("/jobcards", &parts))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/jobcards");

        let (_, list) = get_json(app, "/jobcards").await;
        list[0].clone()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _state, _dir) = test_app();
        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_list_and_download() {
        let (app, _state, _dir) = test_app();
        let job_card = create_alice(&app).await;

        assert_eq!(job_card["customer"], "Alice");
        assert_eq!(job_card["item"], "Laptop");
        assert_eq!(job_card["complaints"][0]["description"], "won't power on");
        let image_id = job_card["complaints"][0]["images"][0]["id"].as_str().unwrap();

        let req = Request::builder()
            .uri(format!("/images/{image_id}"))
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], PNG);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_customer() {
        let (app, state, _dir) = test_app();
        let parts = vec![
            Part::Text("address", "1 Main St"),
            Part::Text("phone", "555-0100"),
            Part::Text("item", "Laptop"),
        ];

        let (status, body) = send(&app, multipart_request("/jobcards", &parts)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("customer"));
        assert!(state.db.lock().unwrap().list_job_cards().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_with_nested_payload_deletes_image() {
        let (app, state, _dir) = test_app();
        let job_card = create_alice(&app).await;
        let id = job_card["id"].as_str().unwrap();
        let complaint_id = job_card["complaints"][0]["id"].as_str().unwrap();
        let image_id = job_card["complaints"][0]["images"][0]["id"].as_str().unwrap();

        let payload = serde_json::json!({
            "customer": "Alice",
            "address": "1 Main St",
            "phone": "555-0100",
            "item": "Laptop",
            "complaints": [{ "id": complaint_id, "description": "won't power on" }],
            "delete_image_ids": [image_id],
        })
        .to_string();

        let (status, _) = send(
            &app,
            multipart_request(&format!("/jobcards/{id}/edit"), &[Part::Text("payload", &payload)]),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let (status, detail) = get_json(&app, &format!("/jobcards/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["complaints"][0]["id"], complaint_id);
        assert_eq!(detail["complaints"][0]["images"].as_array().unwrap().len(), 0);
        assert!(state.db.lock().unwrap().images().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_unknown_job_card() {
        let (app, _state, _dir) = test_app();
        let uri = format!("/jobcards/{}/edit", Uuid::new_v4());
        let (status, _) = send(&app, multipart_request(&uri, &base_parts())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_reports_success_flag() {
        let (app, state, _dir) = test_app();
        let job_card = create_alice(&app).await;
        let id = job_card["id"].as_str().unwrap();

        let delete = || {
            Request::builder()
                .method("POST")
                .uri(format!("/jobcards/{id}/delete"))
                .body(Body::empty())
                .unwrap()
        };

        let (status, body) = send(&app, delete()).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], true);
        assert!(state.db.lock().unwrap().images().list().unwrap().is_empty());

        let (status, body) = send(&app, delete()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Job card not found");
    }
}

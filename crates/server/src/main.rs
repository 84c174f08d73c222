use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        AnimalInfo, LivenessResponse, NextActionResponse, ResetResponse, StationInfo,
        SubmitRequest,
    },
};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

mod config;
mod queue;

use config::{load_settings, prepare_uploads_dir};
use queue::ActionQueue;

struct AppState {
    queue: ActionQueue,
    station: StationInfo,
    animal_species: String,
    uploads_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let settings = load_settings();
    let uploads_dir = prepare_uploads_dir(&settings.uploads_dir)?;
    let state = Arc::new(AppState {
        queue: ActionQueue::new(ActionQueue::default_script()),
        station: StationInfo {
            name: settings.station_name,
            printer: settings.printer_name,
        },
        animal_species: settings.animal_species,
        uploads_dir,
    });

    let addr: SocketAddr = settings.server_bind.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "mock MES backend listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/next-action", get(next_action))
        .route("/submit", post(submit))
        .route("/upload-photo", post(upload_photo))
        .route("/station", get(station))
        .route("/animal-info", get(animal_info))
        .route("/session", get(session))
        .route("/reset", post(reset))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn validation_error(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(ErrorCode::Validation, message)),
    )
}

fn internal_error(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(ErrorCode::Internal, message)),
    )
}

#[derive(Debug, Deserialize)]
struct SlaughterQuery {
    slaughter: String,
}

async fn next_action(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlaughterQuery>,
) -> Json<NextActionResponse> {
    let response = state.queue.next_for(&query.slaughter).await;
    info!(unit = %query.slaughter, "served next action");
    Json(response)
}

async fn submit(
    Json(request): Json<SubmitRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    if request.slaughter_number.as_str().is_empty() {
        return Err(validation_error("slaughterNumber must not be empty"));
    }
    info!(
        unit = %request.slaughter_number,
        action = %request.action,
        value = %request.value,
        "answer recorded"
    );
    Ok(StatusCode::OK)
}

async fn upload_photo(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let mut photo: Option<(String, Vec<u8>)> = None;
    let mut unit = String::new();
    let mut action = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| validation_error(format!("malformed multipart body: {err}")))?
    {
        match field.name().map(str::to_string).as_deref() {
            Some("photo") => {
                let filename = field.file_name().unwrap_or("photo.bin").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| validation_error(format!("unreadable photo field: {err}")))?;
                photo = Some((filename, bytes.to_vec()));
            }
            Some("slaughterNumber") => {
                unit = field
                    .text()
                    .await
                    .map_err(|err| validation_error(format!("unreadable field: {err}")))?;
            }
            Some("action") => {
                action = field
                    .text()
                    .await
                    .map_err(|err| validation_error(format!("unreadable field: {err}")))?;
            }
            _ => {}
        }
    }

    let Some((original_name, bytes)) = photo else {
        return Err(validation_error("missing photo field"));
    };

    let extension = std::path::Path::new(&original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin");
    let stored_name = format!("{}.{extension}", Uuid::new_v4());
    let path = state.uploads_dir.join(&stored_name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|err| internal_error(format!("storing photo failed: {err}")))?;

    info!(
        unit = %unit,
        action = %action,
        stored = %stored_name,
        size = bytes.len(),
        "photo stored"
    );
    Ok(StatusCode::OK)
}

async fn station(State(state): State<Arc<AppState>>) -> Json<StationInfo> {
    Json(state.station.clone())
}

#[derive(Debug, Deserialize)]
struct AnimalInfoQuery {
    number: String,
}

async fn animal_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnimalInfoQuery>,
) -> Json<AnimalInfo> {
    Json(AnimalInfo {
        id: query.number,
        species: state.animal_species.clone(),
        date: Utc::now().date_naive(),
    })
}

async fn session() -> Json<LivenessResponse> {
    Json(LivenessResponse::ok_now())
}

async fn reset(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlaughterQuery>,
) -> Json<ResetResponse> {
    state.queue.reset(&query.slaughter).await;
    info!(unit = %query.slaughter, "session reset");
    Json(ResetResponse {
        message: "Session has been reset.".into(),
    })
}

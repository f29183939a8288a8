//! Web layer: router, state, and the generation endpoint.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

mod images;
mod views;

use views::{GalleryImage, IndexTemplate};

use crate::cli::CliOptions;
use crate::constants::GALLERY_LIMIT;
use crate::error::ImgenError;
use crate::openai::{
    Background, GenerationRequest, ImageQuality, ImageSize, OpenAiClient, OutputFormat,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub(crate) struct AppState {
    openai: Arc<OpenAiClient>,
    image_model: String,
    image_dir: PathBuf,
}

impl AppState {
    fn new(openai: OpenAiClient, image_model: String, image_dir: PathBuf) -> Self {
        Self {
            openai: Arc::new(openai),
            image_model,
            image_dir,
        }
    }
}

/// POST body for `/generate`. Every field is optional; an absent prompt is
/// forwarded as the empty string and the API decides what it thinks of that.
#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    size: ImageSize,
    #[serde(default)]
    quality: ImageQuality,
    #[serde(default)]
    format: OutputFormat,
    #[serde(default)]
    background: Background,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    success: bool,
    images: Vec<String>,
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, ImgenError> {
    let request = GenerationRequest {
        prompt: body.prompt,
        size: body.size,
        quality: body.quality,
        model: state.image_model.clone(),
        count: 1,
        output_format: body.format,
        background: body.background,
    };

    let response = state.openai.generate(&request).await?;
    let images =
        images::save_images(&state.image_dir, &response.data, request.output_format).await?;
    info!("Saved {} generated image(s)", images.len());

    Ok(Json(GenerateResponse {
        success: true,
        images,
    }))
}

async fn index_handler(State(state): State<AppState>) -> Result<IndexTemplate, ImgenError> {
    let stored = images::list_generated_images(&state.image_dir).await?;
    let gallery = stored
        .into_iter()
        .take(GALLERY_LIMIT)
        .map(GalleryImage::from)
        .collect();
    Ok(IndexTemplate {
        model: state.image_model.clone(),
        gallery,
    })
}

async fn styles_handler() -> impl IntoResponse {
    const STYLES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/static/styles.css"));
    ([(CONTENT_TYPE, "text/css")], STYLES)
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(index_handler))
        .route("/generate", axum::routing::post(generate_handler))
        .route("/static/styles.css", axum::routing::get(styles_handler))
        .route(
            "/static/images/{filename}",
            axum::routing::get(images::image_handler),
        )
}

/// Builds the application state from CLI options and serves until the
/// listener dies.
pub async fn setup_server(options: &CliOptions) -> Result<(), anyhow::Error> {
    let client = OpenAiClient::new(options.openai_api_key.clone(), options.api_url.clone());
    let state = AppState::new(
        client,
        options.image_model.clone(),
        options.image_dir.clone(),
    );
    let app = create_router().with_state(state);

    let addr = format!("{}:{}", options.listen_address, options.port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}

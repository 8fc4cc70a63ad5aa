use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chef::{ImagePayload, PipelineState, RecipeResult};
use chef_client::kitchen::{ProgressSink, RecipeOrchestrator};
use chef_client::PipelineError;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::errors::{ErrorBody, WebError, WebResult};
use crate::{templates, uploads};

#[derive(Clone)]
pub struct AppState {
    pub chef: Arc<RecipeOrchestrator>,
}

/// Build the application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // `GET /` goes to `root`
        .route("/", get(root))
        // `GET /health` goes to `health`
        .route("/health", get(health))
        // `POST /recipe` renders a whole result page, for browsers without javascript
        .route("/recipe", post(create_recipe_page))
        // `POST /api/recipe` answers with JSON
        .route("/api/recipe", post(create_recipe_json))
        // `POST /api/recipe/stream` streams progress, then the rendered recipe
        .route("/api/recipe/stream", post(create_recipe_stream))
        // serve static files from the `./static` directory
        .route("/static/*path", get(serve_static))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            tower_http::compression::CompressionLayer::new()
                .quality(tower_http::CompressionLevel::Fastest),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> WebResult<Html<String>> {
    Ok(Html(templates::render_index()?))
}

// Just reply that everything is okay
async fn health() -> StatusCode {
    StatusCode::OK
}

/// Make a recipe and render it as a page, or render what went wrong.
async fn create_recipe_page(
    State(state): State<AppState>,
    multipart: Multipart,
) -> WebResult<Response> {
    let (image1, image2) = uploads::read_pair(multipart).await?;
    match state.chef.create_recipe(image1, image2).await {
        Ok(result) => Ok(Html(templates::render_recipe_page(&result)?).into_response()),
        Err(err) => Ok((
            StatusCode::BAD_GATEWAY,
            Html(templates::render_error_page(&err)?),
        )
            .into_response()),
    }
}

async fn create_recipe_json(
    State(state): State<AppState>,
    multipart: Multipart,
) -> WebResult<Json<RecipeResult>> {
    let (image1, image2) = uploads::read_pair(multipart).await?;
    Ok(Json(state.chef.create_recipe(image1, image2).await?))
}

#[derive(Debug, Serialize)]
struct ProgressBody {
    percent: u8,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct ResultBody {
    html: String,
}

type EventSender = UnboundedSender<Result<Event, Infallible>>;

/// Forwards pipeline progress to the browser as `progress` events.
struct SseProgress(EventSender);

impl ProgressSink for SseProgress {
    fn state_changed(&self, state: PipelineState) {
        let message = match state {
            PipelineState::Running(stage) => stage.status_message(),
            PipelineState::Done => "Done!",
            // the outcome event says everything else
            PipelineState::Idle | PipelineState::Failed(_) => return,
        };
        send_json(
            &self.0,
            "progress",
            &ProgressBody {
                percent: state.percent(),
                message,
            },
        );
    }
}

fn send_json(tx: &EventSender, name: &str, body: &impl Serialize) {
    match Event::default().event(name).json_data(body) {
        // The browser may have gone away, there is nobody left to tell
        Ok(event) => {
            let _ = tx.send(Ok(event));
        }
        Err(err) => tracing::error!("Could not encode {} event: {}", name, err),
    }
}

fn outcome_event(tx: &EventSender, outcome: Result<RecipeResult, PipelineError>) {
    match outcome {
        Ok(result) => match templates::render_recipe_card(&result) {
            Ok(html) => send_json(tx, "result", &ResultBody { html }),
            Err(err) => {
                tracing::error!("Templating error: {:#}", err);
                send_json(
                    tx,
                    "error",
                    &ErrorBody {
                        error: "An error occurred while showing the recipe. Please try again."
                            .to_string(),
                        detail: err.to_string(),
                        stage: None,
                    },
                );
            }
        },
        Err(err) => send_json(tx, "error", &ErrorBody::from(&err)),
    }
}

/// Run the pipeline in the background and stream its progress.
///
/// Upload problems are still reported as a plain 400 before the stream starts.
async fn create_recipe_stream(
    State(state): State<AppState>,
    multipart: Multipart,
) -> WebResult<Sse<UnboundedReceiverStream<Result<Event, Infallible>>>> {
    let (image1, image2) = uploads::read_pair(multipart).await?;
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(stream_recipe(state.chef, image1, image2, tx));
    Ok(Sse::new(UnboundedReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

/// Send progress and then the outcome of one pipeline run to `tx`.
///
/// Gives up as soon as the receiving end is dropped, abandoning any model
/// calls still in flight.
async fn stream_recipe(
    chef: Arc<RecipeOrchestrator>,
    image1: ImagePayload,
    image2: ImagePayload,
    tx: EventSender,
) {
    let progress = SseProgress(tx.clone());
    tokio::select! {
        outcome = chef.create_recipe_with_progress(image1, image2, &progress) => {
            outcome_event(&tx, outcome);
        }
        _ = tx.closed() => {
            tracing::info!("Client went away, abandoning the recipe");
        }
    }
}

/// Serve static files from in memory using `include_dir!`
async fn serve_static(Path(path): Path<String>) -> WebResult<impl IntoResponse> {
    let dir = include_dir::include_dir!("$CARGO_MANIFEST_DIR/static");
    let bytes = dir.get_file(&path).ok_or(WebError::NotFound)?.contents();
    let header = (
        "Content-Type",
        match path.split('.').last() {
            Some("css") => "text/css",
            Some("js") => "text/javascript",
            Some("png") => "image/png",
            Some("svg") => "image/svg+xml",
            _ => "application/octet-stream",
        },
    );
    Ok(([header], bytes).into_response())
}

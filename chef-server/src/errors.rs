use axum::{
    http,
    response::{IntoResponse, Response},
    Json,
};
use chef::Stage;
use chef_client::PipelineError;
use serde::Serialize;

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Internal Server Error: {0}")]
    Internal(#[from] anyhow::Error),
    #[error("Templating error: {0:#}")]
    Template(#[from] minijinja::Error),
    #[error("{0}")]
    BadUpload(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Not found")]
    NotFound,
}

/// JSON body for a failed recipe request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub stage: Option<Stage>,
}

impl From<&PipelineError> for ErrorBody {
    fn from(err: &PipelineError) -> Self {
        Self {
            error: err.user_message(),
            detail: err.to_string(),
            stage: Some(err.stage()),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            WebError::Internal(_) | WebError::Template(_) => {
                tracing::error!("{}", message);
                (http::StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
            // Upload problems are always explained
            WebError::BadUpload(_) => (http::StatusCode::BAD_REQUEST, message).into_response(),
            WebError::Pipeline(err) => {
                (http::StatusCode::BAD_GATEWAY, Json(ErrorBody::from(&err))).into_response()
            }
            WebError::NotFound => (http::StatusCode::NOT_FOUND, "Not Found").into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn internal_errors_are_logged_and_reported() {
        let response = WebError::Internal(anyhow::anyhow!("disk full")).into_response();
        assert_eq!(response.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Internal Server Error: disk full");
    }

    #[tokio::test]
    async fn bad_uploads_explain_themselves() {
        let response = WebError::BadUpload("Please upload a photo of each ingredient.".into())
            .into_response();
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(
            body_text(response).await,
            "Please upload a photo of each ingredient."
        );
    }
}

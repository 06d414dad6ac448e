use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

#[derive(thiserror::Error, Debug)]
pub enum ArticleError {
    #[error("Missing '{0}' in request body")]
    MissingField(&'static str),

    #[error("Request body must contain either 'title', 'style' or 'content'")]
    NoUpdatableFields,

    #[error("Article doesn't exist")]
    NotFound(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Internal server error")]
    Store(#[from] blogful_shared::db::Error),
}

pub type Result<T> = std::result::Result<T, ArticleError>;

impl ArticleError {
    pub fn status(&self) -> StatusCode {
        match self {
            ArticleError::MissingField(_)
            | ArticleError::NoUpdatableFields
            | ArticleError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ArticleError::NotFound(_) => StatusCode::NOT_FOUND,
            ArticleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Response body for every failed request
#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema, Debug, PartialEq)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema, Debug, PartialEq)]
pub struct ErrorMessage {
    pub message: String,
}

impl IntoResponse for ArticleError {
    fn into_response(self) -> Response {
        match &self {
            ArticleError::Store(e) => {
                tracing::error!(error = ?e, "store failure");
            }
            ArticleError::NotFound(id) => {
                tracing::debug!(%id, "article not found");
            }
            e => {
                tracing::debug!(error = %e, "rejected request");
            }
        }

        let body = ErrorBody {
            error: ErrorMessage {
                message: self.to_string(),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

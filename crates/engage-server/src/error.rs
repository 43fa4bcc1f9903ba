use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engage_core::EngageError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses. Bodies are `{ "error": "..." }`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(EngageError::InvalidArgument(msg.into()).into())
    }
}

fn status_for(e: &EngageError) -> StatusCode {
    match e {
        EngageError::ProjectNotFound(_)
        | EngageError::ItemNotFound(_)
        | EngageError::SprintNotFound(_)
        | EngageError::EpicNotFound(_)
        | EngageError::TaskNotFound(_)
        | EngageError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
        EngageError::NotInitialized
        | EngageError::InvalidArgument(_)
        | EngageError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
        EngageError::PreconditionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngageError::ConcurrentModification { .. } => StatusCode::CONFLICT,
        EngageError::Store(_) | EngageError::Io(_) | EngageError::Yaml(_) | EngageError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self
            .0
            .downcast_ref::<EngageError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(e: EngageError) -> StatusCode {
        AppError(e.into()).into_response().status()
    }

    #[test]
    fn not_found_family_maps_to_404() {
        assert_eq!(status(EngageError::ItemNotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(EngageError::SprintNotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(EngageError::CollectionNotFound("x".into())), StatusCode::NOT_FOUND);
    }

    #[test]
    fn bad_input_maps_to_400() {
        assert_eq!(status(EngageError::InvalidStatus("done".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(EngageError::NotInitialized), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::bad_request("nope").into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn precondition_maps_to_422() {
        assert_eq!(
            status(EngageError::PreconditionFailed("open tasks".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn exhausted_retries_map_to_409() {
        assert_eq!(
            status(EngageError::ConcurrentModification { attempts: 5 }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn foreign_errors_map_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status(EngageError::Store("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

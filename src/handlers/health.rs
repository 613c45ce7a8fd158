use crate::error::{HealthResponse, UnhealthyResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// GET /health handler - Health check endpoint
///
/// Asks the book repository to verify its backing store is reachable.
/// Returns 200 OK if it is, 503 Service Unavailable otherwise.
#[utoipa::path(
    get,
    path = routes::HEALTH,
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = UnhealthyResponse)
    ),
    tag = "health"
)]
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<HealthResponse>), (StatusCode, Json<UnhealthyResponse>)> {
    match state.books.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            Ok((
                StatusCode::OK,
                Json(HealthResponse {
                    status: "healthy".to_string(),
                }),
            ))
        }
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(UnhealthyResponse {
                    status: "unhealthy".to_string(),
                    error: format!("Cannot connect to database: {}", e),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{send, setup_test_app, setup_test_app_with, FailingBookRepository};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_endpoint_healthy() {
        let app = setup_test_app();

        let (status, body) = send(&app, "GET", routes::HEALTH, None).await;

        assert_eq!(status, StatusCode::OK);
        let response: HealthResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_health_endpoint_unhealthy() {
        let app = setup_test_app_with(Arc::new(FailingBookRepository));

        let (status, body) = send(&app, "GET", routes::HEALTH, None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let response: UnhealthyResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.status, "unhealthy");
        assert!(response.error.contains("Cannot connect to database"));
        assert!(response.error.contains("storage unavailable"));
    }
}

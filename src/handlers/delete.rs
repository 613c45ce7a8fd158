use crate::error::{parse_pk, ApiError, ErrorResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::Path, extract::State, http::StatusCode};

/// DELETE /api/books/{pk}/ handler - Destroy a book
///
/// Responds with 204 and an empty body. The pk is never reassigned.
#[utoipa::path(
    delete,
    path = routes::BOOK_ITEM,
    params(
        ("pk" = i64, Path, description = "Primary key of the book")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "books"
)]
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(pk_str): Path<String>,
) -> Result<StatusCode, ApiError> {
    let pk = parse_pk(&pk_str)?;

    if state.books.delete(pk).await? {
        tracing::info!("Successfully deleted book with pk: {}", pk);
        Ok(StatusCode::NO_CONTENT)
    } else {
        tracing::info!("Book not found with pk: {}", pk);
        Err(ApiError::BookNotFound(pk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{book_uri, create_book, send, setup_test_app};
    use serde_json::{json, Value as JsonValue};

    #[tokio::test]
    async fn test_delete_endpoint_is_irreversible() {
        let app = setup_test_app();
        let pk = create_book(&app, json!({"title": "Dune", "author": "Frank Herbert"})).await;

        let (status, body) = send(&app, "DELETE", &book_uri(pk), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, JsonValue::Null);

        let (status, _) = send(&app, "GET", &book_uri(pk), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", &book_uri(pk), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_endpoint_not_found_leaves_others() {
        let app = setup_test_app();
        let pk = create_book(&app, json!({"title": "Dune", "author": "Frank Herbert"})).await;

        let (status, body) = send(&app, "DELETE", &book_uri(pk + 1), None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ErrorResponse = serde_json::from_value(body).unwrap();
        assert!(error.error.contains("Book not found"));

        let (status, _) = send(&app, "GET", &book_uri(pk), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_pk_not_reused_after_delete() {
        let app = setup_test_app();
        let first = create_book(&app, json!({"title": "Dune", "author": "Frank Herbert"})).await;
        send(&app, "DELETE", &book_uri(first), None).await;

        let second = create_book(&app, json!({"title": "Dune Messiah", "author": "Frank Herbert"})).await;

        assert_ne!(first, second);
        let (status, _) = send(&app, "GET", &book_uri(first), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

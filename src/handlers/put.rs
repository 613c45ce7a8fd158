use crate::error::{parse_pk, ApiError, ErrorResponse};
use crate::models::{Book, BookChanges};
use crate::routes;
use crate::state::AppState;
use crate::validation::validate_new_book;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value as JsonValue;

/// PUT /api/books/{pk}/ handler - Replace a book
///
/// The body must be a complete representation; optional fields left out are
/// cleared. An unknown `pk` is reported before the body is validated.
#[utoipa::path(
    put,
    path = routes::BOOK_ITEM,
    params(
        ("pk" = i64, Path, description = "Primary key of the book")
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Book replaced", body = Book),
        (status = 400, description = "Validation failed or invalid JSON", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "books"
)]
pub async fn put_handler(
    State(state): State<AppState>,
    Path(pk_str): Path<String>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let pk = parse_pk(&pk_str)?;
    if state.books.get(pk).await?.is_none() {
        tracing::info!("Book not found with pk: {}", pk);
        return Err(ApiError::BookNotFound(pk));
    }

    let Json(body) = payload?;
    let replacement = validate_new_book(&body)?;

    let book = state
        .books
        .update(pk, BookChanges::from(replacement))
        .await?
        .ok_or(ApiError::BookNotFound(pk))?;

    tracing::info!("Successfully replaced book with pk: {}", pk);
    Ok((StatusCode::OK, Json(book)))
}

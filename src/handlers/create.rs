use crate::error::{ApiError, ErrorResponse};
use crate::models::Book;
use crate::routes;
use crate::state::AppState;
use crate::validation::validate_new_book;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::Value as JsonValue;

/// POST /api/books/ handler - Create a book
///
/// `title` and `author` are required; `published_date` (YYYY-MM-DD) and
/// `isbn` are optional. Any `pk` in the body is ignored.
#[utoipa::path(
    post,
    path = routes::BOOK_LIST,
    request_body = serde_json::Value,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Validation failed or invalid JSON", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "books"
)]
pub async fn create_handler(
    State(state): State<AppState>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let Json(body) = payload?;
    let new_book = validate_new_book(&body)?;

    let book = state.books.create(new_book).await?;

    tracing::info!("Created book with pk: {}", book.pk);
    Ok((StatusCode::CREATED, Json(book)))
}

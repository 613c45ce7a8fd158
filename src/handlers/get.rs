use crate::error::{parse_pk, ApiError, ErrorResponse};
use crate::models::Book;
use crate::routes;
use crate::state::AppState;
use axum::{extract::Path, extract::State, http::StatusCode, Json};

/// GET /api/books/{pk}/ handler - Retrieve a book
#[utoipa::path(
    get,
    path = routes::BOOK_ITEM,
    params(
        ("pk" = i64, Path, description = "Primary key of the book")
    ),
    responses(
        (status = 200, description = "Book found", body = Book),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "books"
)]
pub async fn get_handler(
    State(state): State<AppState>,
    Path(pk_str): Path<String>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let pk = parse_pk(&pk_str)?;

    match state.books.get(pk).await? {
        Some(book) => {
            tracing::info!("Successfully retrieved book with pk: {}", pk);
            Ok((StatusCode::OK, Json(book)))
        }
        None => {
            tracing::info!("Book not found with pk: {}", pk);
            Err(ApiError::BookNotFound(pk))
        }
    }
}

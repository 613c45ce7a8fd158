use crate::error::{ApiError, ErrorResponse};
use crate::models::Book;
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// GET /api/books/ handler - List all books
///
/// Returns every stored book as a JSON array, ordered by ascending `pk`.
#[utoipa::path(
    get,
    path = routes::BOOK_LIST,
    responses(
        (status = 200, description = "All books, ordered by pk", body = Vec<Book>),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "books"
)]
pub async fn list_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Vec<Book>>), ApiError> {
    let books = state.books.list().await?;

    tracing::info!("Listed {} books", books.len());
    Ok((StatusCode::OK, Json(books)))
}

use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::Book;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "books-api",
        version = "1.0.0",
        description = "CRUD endpoints for a single Book resource"
    ),
    paths(
        handlers::health::health_handler,
        handlers::list::list_handler,
        handlers::create::create_handler,
        handlers::get::get_handler,
        handlers::put::put_handler,
        handlers::patch::patch_handler,
        handlers::delete::delete_handler
    ),
    components(
        schemas(
            Book,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "books", description = "Book collection and item operations")
    )
)]
pub struct ApiDoc;

// Route path constants - single source of truth for all API paths

use std::time::Duration;

use axum::{
    http::Uri,
    response::Redirect,
    routing::{any, get},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::handlers::{
    create_handler, delete_handler, get_handler, health_handler, list_handler, patch_handler,
    put_handler,
};
use crate::state::AppState;

pub const HEALTH: &str = "/health";
pub const BOOK_LIST: &str = "/api/books/";
pub const BOOK_ITEM: &str = "/api/books/{pk}/";
pub const BOOK_LIST_NO_SLASH: &str = "/api/books";
pub const BOOK_ITEM_NO_SLASH: &str = "/api/books/{pk}";
pub const SWAGGER_UI: &str = "/swagger-ui";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";

/// Build the application router. Called once at startup.
pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route(HEALTH, get(health_handler))
        .route(BOOK_LIST, get(list_handler).post(create_handler))
        .route(
            BOOK_ITEM,
            get(get_handler)
                .put(put_handler)
                .patch(patch_handler)
                .delete(delete_handler),
        )
        .route(BOOK_LIST_NO_SLASH, any(append_slash))
        .route(BOOK_ITEM_NO_SLASH, any(append_slash))
        .merge(SwaggerUi::new(SWAGGER_UI).url(OPENAPI_JSON, ApiDoc::openapi()))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Redirect a book route missing its trailing slash; 308 keeps the method.
async fn append_slash(uri: Uri) -> Redirect {
    let target = match uri.query() {
        Some(query) => format!("{}/?{}", uri.path(), query),
        None => format!("{}/", uri.path()),
    };
    Redirect::permanent(&target)
}

use std::{fmt::Debug, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{Config, StorageBackend};
use crate::models::{Book, BookChanges, NewBook};

/// In-memory repository implementation.
pub mod memory;
/// Cloud Spanner repository implementation.
pub mod spanner;

pub use memory::MemoryBookRepository;
pub use spanner::SpannerBookRepository;

/// Storage operations behind the book endpoints.
///
/// Missing books are reported through `Option`/`bool`; an `Err` always means
/// the storage layer itself failed.
#[async_trait]
pub trait BookRepository: Debug + Send + Sync {
    /// All stored books, ordered by ascending `pk`.
    async fn list(&self) -> Result<Vec<Book>>;

    /// Store a new book and return it with its freshly assigned `pk`.
    async fn create(&self, book: NewBook) -> Result<Book>;

    async fn get(&self, pk: i64) -> Result<Option<Book>>;

    /// Apply `changes` to the book with this `pk`.
    ///
    /// # Returns
    ///
    /// The updated book, or `None` if no book has this `pk`.
    async fn update(&self, pk: i64, changes: BookChanges) -> Result<Option<Book>>;

    /// Returns `true` if a book was deleted, `false` if not found.
    async fn delete(&self, pk: i64) -> Result<bool>;

    /// Verify the backing store is reachable.
    async fn health_check(&self) -> Result<()>;
}

/// Thread-safe shared reference to a book repository.
pub type BookRepositoryArc = Arc<dyn BookRepository>;

/// Build the repository selected by `STORAGE_BACKEND`.
pub async fn from_config(config: &Config) -> Result<BookRepositoryArc> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory book storage; data is lost on restart");
            Ok(Arc::new(MemoryBookRepository::new()))
        }
        StorageBackend::Spanner => {
            let spanner_config = config
                .spanner
                .as_ref()
                .context("Spanner backend selected but Spanner settings are missing")?;
            let repository = SpannerBookRepository::from_config(spanner_config).await?;
            Ok(Arc::new(repository))
        }
    }
}

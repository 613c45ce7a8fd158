use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{Book, BookChanges, NewBook};
use crate::repository::BookRepository;

#[derive(Debug, Default)]
struct MemoryState {
    books: BTreeMap<i64, Book>,
    /// Highest pk ever handed out; deleted pks are not reused
    last_pk: i64,
}

/// In-memory implementation of the book repository.
#[derive(Debug, Default)]
pub struct MemoryBookRepository {
    state: RwLock<MemoryState>,
}

impl MemoryBookRepository {
    /// Creates a new empty memory book repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn list(&self) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        Ok(state.books.values().cloned().collect())
    }

    async fn create(&self, book: NewBook) -> Result<Book> {
        let mut state = self.state.write().await;
        state.last_pk += 1;
        let book = book.into_book(state.last_pk);
        state.books.insert(book.pk, book.clone());

        tracing::debug!("Inserted book with pk: {}", book.pk);
        Ok(book)
    }

    async fn get(&self, pk: i64) -> Result<Option<Book>> {
        let state = self.state.read().await;
        Ok(state.books.get(&pk).cloned())
    }

    async fn update(&self, pk: i64, changes: BookChanges) -> Result<Option<Book>> {
        let mut state = self.state.write().await;
        let Some(book) = state.books.get_mut(&pk) else {
            return Ok(None);
        };
        changes.apply_to(book);

        tracing::debug!("Updated book with pk: {}", pk);
        Ok(Some(book.clone()))
    }

    async fn delete(&self, pk: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        let deleted = state.books.remove(&pk).is_some();
        if deleted {
            tracing::debug!("Deleted book with pk: {}", pk);
        }
        Ok(deleted)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_book(title: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            published_date: None,
            isbn: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_pks() {
        let repo = MemoryBookRepository::new();

        let first = repo.create(new_book("Dune")).await.unwrap();
        let second = repo.create(new_book("Dune Messiah")).await.unwrap();

        assert_eq!(first.pk, 1);
        assert_eq!(second.pk, 2);
        assert_eq!(repo.get(1).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_pks_are_not_reused_after_delete() {
        let repo = MemoryBookRepository::new();
        repo.create(new_book("Dune")).await.unwrap();
        let second = repo.create(new_book("Dune Messiah")).await.unwrap();

        assert!(repo.delete(second.pk).await.unwrap());
        let third = repo.create(new_book("Children of Dune")).await.unwrap();

        assert_eq!(third.pk, 3);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_pk() {
        let repo = MemoryBookRepository::new();
        for title in ["C", "A", "B"] {
            repo.create(new_book(title)).await.unwrap();
        }
        repo.delete(2).await.unwrap();

        let pks: Vec<i64> = repo.list().await.unwrap().iter().map(|b| b.pk).collect();
        assert_eq!(pks, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_missing_pk_is_not_mutated() {
        let repo = MemoryBookRepository::new();
        repo.create(new_book("Dune")).await.unwrap();

        let changes = BookChanges {
            title: Some("Other".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.update(42, changes).await.unwrap(), None);
        assert!(!repo.delete(42).await.unwrap());
        assert_eq!(repo.get(42).await.unwrap(), None);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_get_unique_pks() {
        let repo = Arc::new(MemoryBookRepository::new());

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.create(new_book(&format!("Book {}", i))).await })
            })
            .collect();

        let mut pks = Vec::new();
        for handle in handles {
            pks.push(handle.await.unwrap().unwrap().pk);
        }
        pks.sort_unstable();
        pks.dedup();

        assert_eq!(pks.len(), 50);
        assert_eq!(repo.list().await.unwrap().len(), 50);
    }
}

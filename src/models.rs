use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A stored book as returned by every book endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Book {
    /// Primary key, assigned on create and never changed
    #[schema(example = 1)]
    pub pk: i64,
    #[schema(example = "Dune")]
    pub title: String,
    #[schema(example = "Frank Herbert")]
    pub author: String,
    #[schema(example = "1965-08-01")]
    pub published_date: Option<NaiveDate>,
    /// Normalized ISBN-10 or ISBN-13, digits only (ISBN-10 may end in `X`)
    #[schema(example = "9780441013593")]
    pub isbn: Option<String>,
}

/// Validated fields for a book that has not been assigned a `pk` yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub published_date: Option<NaiveDate>,
    pub isbn: Option<String>,
}

impl NewBook {
    pub fn into_book(self, pk: i64) -> Book {
        Book {
            pk,
            title: self.title,
            author: self.author,
            published_date: self.published_date,
            isbn: self.isbn,
        }
    }
}

/// Field changes for an update. `None` leaves the field untouched; for the
/// nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<Option<NaiveDate>>,
    pub isbn: Option<Option<String>>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.published_date.is_none()
            && self.isbn.is_none()
    }

    pub fn apply_to(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(published_date) = self.published_date {
            book.published_date = published_date;
        }
        if let Some(isbn) = self.isbn {
            book.isbn = isbn;
        }
    }
}

/// A full replacement sets every field, including clearing the nullable ones.
impl From<NewBook> for BookChanges {
    fn from(book: NewBook) -> Self {
        BookChanges {
            title: Some(book.title),
            author: Some(book.author),
            published_date: Some(book.published_date),
            isbn: Some(book.isbn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> Book {
        Book {
            pk: 1,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            published_date: NaiveDate::from_ymd_opt(1965, 8, 1),
            isbn: Some("9780441013593".to_string()),
        }
    }

    #[test]
    fn test_book_serializes_with_pk_and_iso_date() {
        let json = serde_json::to_value(dune()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "pk": 1,
                "title": "Dune",
                "author": "Frank Herbert",
                "published_date": "1965-08-01",
                "isbn": "9780441013593"
            })
        );
    }

    #[test]
    fn test_partial_changes_keep_other_fields() {
        let mut book = dune();
        BookChanges {
            title: Some("Dune Messiah".to_string()),
            ..Default::default()
        }
        .apply_to(&mut book);

        assert_eq!(book.title, "Dune Messiah");
        assert_eq!(book.author, "Frank Herbert");
        assert_eq!(book.isbn.as_deref(), Some("9780441013593"));
    }

    #[test]
    fn test_full_replacement_clears_nullable_fields() {
        let mut book = dune();
        let replacement = NewBook {
            title: "Children of Dune".to_string(),
            author: "Frank Herbert".to_string(),
            published_date: None,
            isbn: None,
        };
        BookChanges::from(replacement).apply_to(&mut book);

        assert_eq!(book.pk, 1);
        assert_eq!(book.title, "Children of Dune");
        assert_eq!(book.published_date, None);
        assert_eq!(book.isbn, None);
    }

    #[test]
    fn test_empty_changes() {
        assert!(BookChanges::default().is_empty());
        assert!(!BookChanges {
            isbn: Some(None),
            ..Default::default()
        }
        .is_empty());
    }
}

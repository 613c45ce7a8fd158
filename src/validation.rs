use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::{Map, Value as JsonValue};

use crate::models::{BookChanges, NewBook};

pub const TITLE_MAX_LEN: usize = 200;
pub const AUTHOR_MAX_LEN: usize = 100;

const NON_FIELD_ERRORS: &str = "non_field_errors";
const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_STRING: &str = "Not a valid string.";
const NOT_BLANK: &str = "This field may not be blank.";
const BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";
const BAD_ISBN: &str = "Enter a valid ISBN-10 or ISBN-13.";

/// Field name to list of messages, ordered by field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Default)]
struct Collector {
    errors: FieldErrors,
}

impl Collector {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.errors.is_empty() {
            Ok(value())
        } else {
            Err(self.errors)
        }
    }
}

/// Validate a create or full-update body. `title` and `author` must be
/// present; absent optional fields become null.
pub fn validate_new_book(body: &JsonValue) -> Result<NewBook, FieldErrors> {
    let object = expect_object(body)?;
    let mut errors = Collector::default();

    let title = required_text(object, "title", TITLE_MAX_LEN, &mut errors);
    let author = required_text(object, "author", AUTHOR_MAX_LEN, &mut errors);
    let published_date = object
        .get("published_date")
        .and_then(|value| published_date(value, &mut errors))
        .flatten();
    let isbn = object
        .get("isbn")
        .and_then(|value| isbn(value, &mut errors))
        .flatten();

    errors.finish(|| NewBook {
        title: title.unwrap_or_default(),
        author: author.unwrap_or_default(),
        published_date,
        isbn,
    })
}

/// Validate a partial-update body. Only fields present in the body are
/// checked and returned as changes.
pub fn validate_book_changes(body: &JsonValue) -> Result<BookChanges, FieldErrors> {
    let object = expect_object(body)?;
    let mut errors = Collector::default();

    let title = object
        .get("title")
        .and_then(|value| text(value, "title", TITLE_MAX_LEN, &mut errors));
    let author = object
        .get("author")
        .and_then(|value| text(value, "author", AUTHOR_MAX_LEN, &mut errors));
    let published_date = object
        .get("published_date")
        .and_then(|value| published_date(value, &mut errors));
    let isbn = object.get("isbn").and_then(|value| isbn(value, &mut errors));

    errors.finish(|| BookChanges {
        title,
        author,
        published_date,
        isbn,
    })
}

fn expect_object(body: &JsonValue) -> Result<&Map<String, JsonValue>, FieldErrors> {
    match body {
        JsonValue::Object(object) => Ok(object),
        other => {
            let mut errors = Collector::default();
            errors.add(
                NON_FIELD_ERRORS,
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    json_kind(other)
                ),
            );
            Err(errors.errors)
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "str",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "dict",
    }
}

fn required_text(
    object: &Map<String, JsonValue>,
    field: &str,
    max_len: usize,
    errors: &mut Collector,
) -> Option<String> {
    match object.get(field) {
        Some(value) => text(value, field, max_len, errors),
        None => {
            errors.add(field, REQUIRED);
            None
        }
    }
}

/// String content of `value`. Numbers are accepted as their decimal text;
/// bools, arrays and objects are not.
fn as_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(raw) => Some(raw.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(value: &JsonValue, field: &str, max_len: usize, errors: &mut Collector) -> Option<String> {
    let raw = match value {
        JsonValue::Null => {
            errors.add(field, NOT_NULL);
            return None;
        }
        other => match as_text(other) {
            Some(raw) => raw,
            None => {
                errors.add(field, NOT_STRING);
                return None;
            }
        },
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.add(field, NOT_BLANK);
        return None;
    }
    if trimmed.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {} characters.", max_len),
        );
        return None;
    }
    Some(trimmed.to_string())
}

/// Returns `Some(None)` for an explicit null, `None` when invalid.
fn published_date(value: &JsonValue, errors: &mut Collector) -> Option<Option<NaiveDate>> {
    match value {
        JsonValue::Null => Some(None),
        JsonValue::String(raw) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => Some(Some(date)),
            Err(_) => {
                errors.add("published_date", BAD_DATE);
                None
            }
        },
        _ => {
            errors.add("published_date", BAD_DATE);
            None
        }
    }
}

/// Returns `Some(None)` for an explicit null or empty string, `None` when invalid.
fn isbn(value: &JsonValue, errors: &mut Collector) -> Option<Option<String>> {
    if value.is_null() {
        return Some(None);
    }
    let Some(raw) = as_text(value) else {
        errors.add("isbn", NOT_STRING);
        return None;
    };
    if raw.trim().is_empty() {
        return Some(None);
    }
    match normalize_isbn(&raw) {
        Some(isbn) => Some(Some(isbn)),
        None => {
            errors.add("isbn", BAD_ISBN);
            None
        }
    }
}

/// Strip separators and verify the ISBN-10 or ISBN-13 check digit.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let isbn: String = raw
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let valid = match isbn.len() {
        10 => isbn10_checksum_ok(&isbn),
        13 => isbn13_checksum_ok(&isbn),
        _ => false,
    };
    valid.then_some(isbn)
}

fn isbn10_checksum_ok(isbn: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in isbn.chars().enumerate() {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'X' if i == 9 => 10,
            _ => return false,
        };
        sum += digit * (10 - i as u32);
    }
    sum % 11 == 0
}

fn isbn13_checksum_ok(isbn: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in isbn.chars().enumerate() {
        let Some(digit) = c.to_digit(10) else {
            return false;
        };
        sum += if i % 2 == 0 { digit } else { digit * 3 };
    }
    sum % 10 == 0
}

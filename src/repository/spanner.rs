use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use gcloud_gax::grpc::{Code, Status};
use gcloud_gax::retry::TryAs;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert, insert_or_update, update};
use gcloud_spanner::row::Row;
use gcloud_spanner::session::SessionError;
use gcloud_spanner::statement::Statement;
use gcloud_spanner::transaction_rw::ReadWriteTransaction;
use gcloud_spanner::value::CommitTimestamp;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::config::SpannerConfig;
use crate::models::{Book, BookChanges, NewBook};
use crate::repository::BookRepository;

const BOOKS_TABLE: &str = "books";
/// One row per table holding the highest id ever handed out
const ID_COUNTER_TABLE: &str = "id_counters";
const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_BOOKS: &str = "SELECT id, title, author, published_date, isbn FROM books";

const BOOKS_DDL: &str = r#"
CREATE TABLE books (
    id INT64 NOT NULL,
    title STRING(200) NOT NULL,
    author STRING(100) NOT NULL,
    published_date STRING(10),
    isbn STRING(13),
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (id)
"#;

const ID_COUNTERS_DDL: &str = r#"
CREATE TABLE id_counters (
    name STRING(64) NOT NULL,
    last_id INT64 NOT NULL,
) PRIMARY KEY (name)
"#;

/// Errors raised while reading or writing rows, including inside
/// read-write transactions (which retry on `Aborted`).
#[derive(Debug, thiserror::Error)]
pub enum SpannerError {
    #[error(transparent)]
    Grpc(#[from] Status),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Row(#[from] gcloud_spanner::row::Error),
    #[error("invalid published_date '{0}' stored for book")]
    InvalidDate(String),
}

impl TryAs<Status> for SpannerError {
    fn try_as(&self) -> Option<&Status> {
        match self {
            SpannerError::Grpc(status) => Some(status),
            _ => None,
        }
    }
}

/// Book repository backed by Cloud Spanner
#[derive(Clone)]
pub struct SpannerBookRepository {
    inner: Arc<Client>,
}

impl fmt::Debug for SpannerBookRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpannerBookRepository").finish_non_exhaustive()
    }
}

impl SpannerBookRepository {
    /// Create a new Spanner-backed repository from configuration
    ///
    /// The gcloud-spanner library automatically detects the
    /// SPANNER_EMULATOR_HOST environment variable and connects to
    /// the emulator when set, or production Spanner otherwise.
    ///
    /// The instance, database, and tables are created first if they
    /// don't exist.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        auto_provision(config).await?;

        let database_path = config.database_path();

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        // ClientConfig::default() automatically uses SPANNER_EMULATOR_HOST if set
        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }
}

#[async_trait]
impl BookRepository for SpannerBookRepository {
    async fn list(&self) -> Result<Vec<Book>> {
        let statement = Statement::new(format!("{} ORDER BY id ASC", SELECT_BOOKS));

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction for list")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to list books from Spanner")?;

        let mut books = Vec::new();
        while let Some(row) = result_set.next().await? {
            books.push(book_from_row(&row)?);
        }

        tracing::debug!("Listed {} books", books.len());
        Ok(books)
    }

    /// The id counter row and the new book are written in one transaction,
    /// so concurrent creates abort and retry instead of sharing an id.
    async fn create(&self, book: NewBook) -> Result<Book> {
        let result: Result<(_, i64), SpannerError> = self
            .inner
            .read_write_transaction(|tx| {
                let book = book.clone();
                Box::pin(async move {
                    let pk = last_assigned_pk(tx).await? + 1;
                    let counter_name = BOOKS_TABLE.to_string();
                    let published_date = format_date(book.published_date);

                    tx.buffer_write(vec![
                        insert_or_update(ID_COUNTER_TABLE, &["name", "last_id"], &[&counter_name, &pk]),
                        insert(
                            BOOKS_TABLE,
                            &["id", "title", "author", "published_date", "isbn", "created_at", "updated_at"],
                            &[
                                &pk,
                                &book.title,
                                &book.author,
                                &published_date,
                                &book.isbn,
                                &CommitTimestamp::new(),
                                &CommitTimestamp::new(),
                            ],
                        ),
                    ]);
                    Ok(pk)
                })
            })
            .await;

        let (_, pk) = result.context("Failed to insert book into Spanner")?;

        tracing::debug!("Inserted book with pk: {}", pk);
        Ok(book.into_book(pk))
    }

    async fn get(&self, pk: i64) -> Result<Option<Book>> {
        let mut statement = Statement::new(format!("{} WHERE id = @id", SELECT_BOOKS));
        statement.add_param("id", &pk);

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query book from Spanner")?;

        if let Some(row) = result_set.next().await? {
            tracing::debug!("Read book with pk: {}", pk);
            Ok(Some(book_from_row(&row)?))
        } else {
            tracing::debug!("Book not found with pk: {}", pk);
            Ok(None)
        }
    }

    async fn update(&self, pk: i64, changes: BookChanges) -> Result<Option<Book>> {
        let result: Result<(_, Option<Book>), SpannerError> = self
            .inner
            .read_write_transaction(|tx| {
                let changes = changes.clone();
                Box::pin(async move {
                    let Some(mut book) = read_book(tx, pk).await? else {
                        return Ok(None);
                    };
                    if changes.is_empty() {
                        return Ok(Some(book));
                    }
                    changes.apply_to(&mut book);

                    let published_date = format_date(book.published_date);
                    tx.buffer_write(vec![update(
                        BOOKS_TABLE,
                        &["id", "title", "author", "published_date", "isbn", "updated_at"],
                        &[
                            &pk,
                            &book.title,
                            &book.author,
                            &published_date,
                            &book.isbn,
                            &CommitTimestamp::new(),
                        ],
                    )]);
                    Ok(Some(book))
                })
            })
            .await;

        let (_, book) = result.context("Failed to update book in Spanner")?;
        if book.is_some() {
            tracing::debug!("Updated book with pk: {}", pk);
        }
        Ok(book)
    }

    async fn delete(&self, pk: i64) -> Result<bool> {
        let result: Result<(_, bool), SpannerError> = self
            .inner
            .read_write_transaction(|tx| {
                Box::pin(async move {
                    if read_book(tx, pk).await?.is_none() {
                        return Ok(false);
                    }
                    tx.buffer_write(vec![delete(BOOKS_TABLE, Key::new(&pk))]);
                    Ok(true)
                })
            })
            .await;

        let (_, deleted) = result.context("Failed to delete book from Spanner")?;
        if deleted {
            tracing::debug!("Deleted book with pk: {}", pk);
        }
        Ok(deleted)
    }

    /// Perform a health check by executing a simple query
    async fn health_check(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow!("Health check query returned no results"))
        }
    }
}

async fn read_book(tx: &mut ReadWriteTransaction, pk: i64) -> Result<Option<Book>, SpannerError> {
    let mut statement = Statement::new(format!("{} WHERE id = @id", SELECT_BOOKS));
    statement.add_param("id", &pk);

    let mut rows = tx.query(statement).await?;
    match rows.next().await? {
        Some(row) => Ok(Some(book_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Highest book id ever assigned. Falls back to `MAX(id)` for databases
/// written before the counter row existed.
async fn last_assigned_pk(tx: &mut ReadWriteTransaction) -> Result<i64, SpannerError> {
    let mut statement = Statement::new("SELECT last_id FROM id_counters WHERE name = @name");
    statement.add_param("name", &BOOKS_TABLE.to_string());

    let counter: Option<i64> = {
        let mut rows = tx.query(statement).await?;
        match rows.next().await? {
            Some(row) => Some(row.column_by_name("last_id")?),
            None => None,
        }
    };
    if let Some(last_id) = counter {
        return Ok(last_id);
    }

    let mut rows = tx
        .query(Statement::new("SELECT COALESCE(MAX(id), 0) AS max_id FROM books"))
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.column_by_name("max_id")?),
        None => Ok(0),
    }
}

fn book_from_row(row: &Row) -> Result<Book, SpannerError> {
    let published_date: Option<String> = row.column_by_name("published_date")?;

    Ok(Book {
        pk: row.column_by_name("id")?,
        title: row.column_by_name("title")?,
        author: row.column_by_name("author")?,
        published_date: parse_date(published_date.as_deref())?,
        isbn: row.column_by_name("isbn")?,
    })
}

/// Dates are stored as ISO-8601 `STRING(10)` columns.
fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|date| date.format(DATE_FORMAT).to_string())
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, SpannerError> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map_err(|_| SpannerError::InvalidDate(raw.to_string()))
        })
        .transpose()
}

/// Create the instance, database, and tables this repository needs,
/// skipping whatever already exists.
async fn auto_provision(config: &SpannerConfig) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    let instance_lookup = admin.instance().get_instance(
        GetInstanceRequest {
            name: instance_path.clone(),
            field_mask: None,
        },
        None,
    );
    ensure_exists("instance", &instance_path, instance_lookup, async {
        let instance_config = match config.emulator_host {
            Some(_) => format!("{}/instanceConfigs/emulator-config", project_path),
            None => format!("{}/instanceConfigs/regional-us-central1", project_path),
        };
        let request = CreateInstanceRequest {
            parent: project_path.clone(),
            instance_id: config.instance.clone(),
            instance: Some(Instance {
                name: instance_path.clone(),
                config: instance_config,
                display_name: format!("{} instance", config.instance),
                node_count: 1,
                ..Default::default()
            }),
        };
        let mut operation = admin
            .instance()
            .create_instance(request, None)
            .await
            .context("Failed to start instance creation")?;
        operation.wait(None).await.context("Failed to create instance")?;
        Ok(())
    })
    .await?;

    let database_lookup = admin.database().get_database(
        GetDatabaseRequest {
            name: database_path.clone(),
        },
        None,
    );
    ensure_exists("database", &database_path, database_lookup, async {
        let request = CreateDatabaseRequest {
            parent: instance_path.clone(),
            create_statement: format!("CREATE DATABASE `{}`", config.database),
            extra_statements: vec![],
            encryption_config: None,
            database_dialect: 1, // Google Standard SQL
            proto_descriptors: vec![],
        };
        let mut operation = admin
            .database()
            .create_database(request, None)
            .await
            .context("Failed to start database creation")?;
        operation.wait(None).await.context("Failed to create database")?;
        Ok(())
    })
    .await?;

    ensure_tables_exist(&admin, &database_path).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Await `lookup`; on NOT_FOUND await `create`, any other failure is an error.
/// `create` is never polled when the resource already exists.
async fn ensure_exists<T>(
    kind: &str,
    path: &str,
    lookup: impl Future<Output = Result<T, Status>>,
    create: impl Future<Output = Result<()>>,
) -> Result<()> {
    match lookup.await {
        Ok(_) => {
            tracing::info!("Spanner {} already exists: {}", kind, path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Spanner {} not found, creating: {}", kind, path);
            create.await?;
            tracing::info!("Spanner {} created: {}", kind, path);
            Ok(())
        }
        Err(status) => Err(anyhow!(
            "Failed to check {} existence: {}",
            kind,
            status.message()
        )),
    }
}

fn has_table(statements: &[String], table: &str) -> bool {
    let plain = format!("CREATE TABLE {} ", table);
    let quoted = format!("CREATE TABLE `{}`", table);
    statements
        .iter()
        .any(|stmt| stmt.contains(&plain) || stmt.contains(&quoted))
}

/// DDL for every table missing from `existing`, in creation order.
fn missing_tables_ddl(existing: &[String]) -> Vec<String> {
    [(BOOKS_TABLE, BOOKS_DDL), (ID_COUNTER_TABLE, ID_COUNTERS_DDL)]
        .into_iter()
        .filter(|(table, _)| !has_table(existing, table))
        .map(|(_, ddl)| ddl.trim().to_string())
        .collect()
}

async fn ensure_tables_exist(admin: &AdminClient, database_path: &str) -> Result<()> {
    let existing = admin
        .database()
        .get_database_ddl(
            GetDatabaseDdlRequest {
                database: database_path.to_string(),
            },
            None,
        )
        .await
        .context("Failed to get database DDL")?
        .into_inner()
        .statements;

    let statements = missing_tables_ddl(&existing);
    if statements.is_empty() {
        tracing::info!("All tables already exist");
        return Ok(());
    }

    tracing::info!("Creating {} missing table(s)", statements.len());
    let request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements,
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin
        .database()
        .update_database_ddl(request, None)
        .await
        .context("Failed to start table creation")?;
    operation.wait(None).await.context("Failed to create tables")?;

    tracing::info!("Tables created");
    Ok(())
}

use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::store::{ExternalStore, Result};
use snip_core::{CollisionStrategy, ShortCode, StoreError, UrlRecord};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::trace;

const RECORD_COLUMNS: &str = "id, original_url, short_code, click_count, created_at, \
     collision_detected, resolution_strategy";

/// MySQL implementation of [`ExternalStore`].
///
/// Identifiers come from the `AUTO_INCREMENT` key of `short_urls`: allocating
/// inserts a row without a short code, and persisting the record fills it in.
/// Rows that never received a short code are invisible to reads.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_urls` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(include_str!("../ddl/mysql/short_urls.sql"))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn click_count(&self, code: &ShortCode) -> Result<Option<u64>> {
        let row = sqlx::query("SELECT click_count FROM short_urls WHERE short_code = ? LIMIT 1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|row| row.try_get("click_count").map_err(map_sqlx_error))
            .transpose()
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

fn row_to_record(row: &MySqlRow) -> Result<UrlRecord> {
    let id: u64 = row.try_get("id").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let click_count: u64 = row.try_get("click_count").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let collision_detected: bool = row.try_get("collision_detected").map_err(map_sqlx_error)?;
    let strategy: Option<String> = row.try_get("resolution_strategy").map_err(map_sqlx_error)?;

    let short_code = ShortCode::new(short_code)
        .map_err(|e| StoreError::InvalidData(format!("row {id}: {e}")))?;
    let created_at = Timestamp::from_microsecond(created_at).map_err(|e| {
        StoreError::InvalidData(format!("invalid created_at '{created_at}' in row {id}: {e}"))
    })?;
    let resolution_strategy = strategy
        .map(|value| value.parse::<CollisionStrategy>())
        .transpose()
        .map_err(|e| StoreError::InvalidData(format!("row {id}: {e}")))?;

    Ok(UrlRecord {
        id,
        original_url,
        short_code,
        click_count,
        created_at,
        collision_detected,
        resolution_strategy,
    })
}

#[async_trait]
impl ExternalStore for MySqlStore {
    async fn allocate_identifier(&self, original_url: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (original_url, created_at)
            VALUES (?, ?)
            "#,
        )
        .bind(original_url)
        .bind(Timestamp::now().as_microsecond())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_id();
        trace!(id, "allocated identifier");
        Ok(id)
    }

    async fn persist_record(&self, record: &UrlRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET original_url = ?,
                short_code = ?,
                click_count = ?,
                created_at = ?,
                collision_detected = ?,
                resolution_strategy = ?
            WHERE id = ?
            "#,
        )
        .bind(&record.original_url)
        .bind(record.short_code.as_str())
        .bind(record.click_count)
        .bind(record.created_at.as_microsecond())
        .bind(record.collision_detected)
        .bind(record.resolution_strategy.map(|s| s.as_str()))
        .bind(record.id)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict(record.short_code.to_string()))
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };

        // MySQL reports zero affected rows for an update that changes nothing,
        // so only a missing row is an error.
        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM short_urls WHERE id = ? LIMIT 1")
                .bind(record.id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?
                .is_some();
            if !exists {
                return Err(StoreError::InvalidData(format!(
                    "identifier {} was never allocated",
                    record.id
                )));
            }
        }

        Ok(())
    }

    async fn persist_click_increment(&self, code: &ShortCode) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET click_count = click_count + 1
            WHERE short_code = ?
            "#,
        )
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Operation(format!(
                "no record for short code {code}"
            )));
        }

        self.click_count(code).await?.ok_or_else(|| {
            StoreError::Operation(format!("record for short code {code} disappeared"))
        })
    }

    async fn fetch_record(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM short_urls WHERE short_code = ? LIMIT 1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn find_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM short_urls \
             WHERE original_url = ? AND short_code IS NOT NULL \
             ORDER BY id LIMIT 1"
        ))
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn list_records(&self) -> Result<Vec<UrlRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM short_urls WHERE short_code IS NOT NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_record).collect()
    }
}

//! Append-only temperature store backed by SQLite.

use std::path::Path;

use remote_temperature_rpc::TemperatureRecord;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, Instrument, Span};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS temperatures (
        device_id   TEXT NOT NULL,
        sensor_id   TEXT NOT NULL,
        time        REAL NOT NULL,
        temperature REAL NOT NULL
    )
"#;

const INSERT: &str =
    "INSERT INTO temperatures (device_id, sensor_id, time, temperature) VALUES (?, ?, ?, ?)";

/// Any failure of the storage engine.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct StorageError(String);

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        Self(e.to_string())
    }
}

/// Handle to the `temperatures` table.
///
/// Holds a single connection, so concurrent appends are serialized.
pub struct Storage {
    pool: SqlitePool,
    span: Span,
}

impl Storage {
    /// Opens (creating if necessary) the database at `path` and ensures the
    /// `temperatures` table exists. Log output is emitted inside `span`.
    pub async fn open(path: impl AsRef<Path>, span: Span) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        span.in_scope(|| debug!("Opened temperature store at {}", path.display()));

        Ok(Self { pool, span })
    }

    /// Appends one record and commits it.
    pub async fn append(&self, record: &TemperatureRecord) -> Result<(), StorageError> {
        sqlx::query(INSERT)
            .bind(record.device_id.as_str())
            .bind(record.sensor_id.as_str())
            .bind(record.time)
            .bind(record.temperature)
            .execute(&self.pool)
            .instrument(self.span.clone())
            .await?;
        Ok(())
    }

    /// Closes the connection. Appends after this fail.
    pub async fn close(&self) {
        self.pool.close().await;
        self.span.in_scope(|| debug!("Closed temperature store"));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// All rows, oldest reading first.
    pub(crate) async fn rows(storage: &Storage) -> Vec<TemperatureRecord> {
        sqlx::query_as::<_, (String, String, f64, f64)>(
            "SELECT device_id, sensor_id, time, temperature FROM temperatures ORDER BY time, rowid",
        )
        .fetch_all(&storage.pool)
        .await
        .unwrap()
        .into_iter()
        .map(|(device_id, sensor_id, time, temperature)| {
            TemperatureRecord::new(device_id, sensor_id, time, temperature)
        })
        .collect()
    }

    async fn table_count(storage: &Storage) -> i64 {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'temperatures'",
        )
        .fetch_one(&storage.pool)
        .await
        .unwrap();
        count
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_logs_inside_given_span() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(
            dir.path().join("temperatures"),
            tracing::info_span!("temperature_store"),
        )
        .await
        .unwrap();
        storage.close().await;

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let opened = output
            .lines()
            .find(|line| line.contains("Opened temperature store"))
            .unwrap();
        assert!(opened.contains("temperature_store"), "{opened}");
        let closed = output
            .lines()
            .find(|line| line.contains("Closed temperature store"))
            .unwrap();
        assert!(closed.contains("temperature_store"), "{closed}");
    }

    #[tokio::test]
    async fn test_open_creates_table() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().join("temperatures"), Span::none())
            .await
            .unwrap();
        assert_eq!(table_count(&storage).await, 1);
        assert!(rows(&storage).await.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_keeps_table_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temperatures");

        let storage = Storage::open(&path, Span::none()).await.unwrap();
        storage
            .append(&TemperatureRecord::new("dev1", "s1", 1.0, 20.0))
            .await
            .unwrap();
        storage.close().await;

        let storage = Storage::open(&path, Span::none()).await.unwrap();
        let again = Storage::open(&path, Span::none()).await.unwrap();
        assert_eq!(table_count(&storage).await, 1);
        assert_eq!(rows(&again).await.len(), 1);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().join("temperatures"), Span::none())
            .await
            .unwrap();

        let records: Vec<TemperatureRecord> = (0..5)
            .map(|i| TemperatureRecord::new("dev1", "s1", 1000.0 + i as f64, 20.0 + i as f64))
            .collect();
        for record in &records {
            storage.append(record).await.unwrap();
        }

        assert_eq!(rows(&storage).await, records);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().join("temperatures"), Span::none())
            .await
            .unwrap();

        let record = TemperatureRecord::new("dev1", "s1", 1000.0, 21.5);
        storage.append(&record).await.unwrap();
        storage.append(&record).await.unwrap();

        assert_eq!(rows(&storage).await, vec![record.clone(), record]);
    }

    #[tokio::test]
    async fn test_append_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().join("temperatures"), Span::none())
            .await
            .unwrap();
        storage.close().await;

        let result = storage
            .append(&TemperatureRecord::new("dev1", "s1", 1.0, 20.0))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_open_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Storage::open(
            dir.path().join("missing").join("temperatures"),
            Span::none(),
        )
        .await;
        assert!(result.is_err());
    }
}

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// Database connection pool type
pub type DbPool = sqlx::PgPool;

/// Database connection type - supports both pool connections and transactions
/// Use `conn.as_mut()` for pool connections, `tx.as_mut()` for transactions
pub type DbConn = sqlx::PgConnection;

/// Pooled connection handed to handlers
pub type PooledConn = sqlx::pool::PoolConnection<sqlx::Postgres>;

/// Attempts made for an operation that keeps failing with transient errors.
pub const MAX_ATTEMPTS: u32 = 3;

/// Base backoff between attempts, multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Builds the pool described by the database section of the config.
///
/// The pool connects lazily so the HTTP server can start (and report health)
/// while the database is still coming up.
pub fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .connect_lazy(config.connection_string().expose_secret())
        .map_err(Error::Sqlx)
}

/// Whether a database error is worth retrying.
///
/// Connection-level failures, pool exhaustion, serialization failures and
/// deadlocks are transient. Constraint violations and bad SQL are not.
pub fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => true,
        sqlx::Error::Protocol(_) | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => match db_err.code() {
            // 08xxx connection exceptions, 40001 serialization failure, 40P01 deadlock,
            // 57P01 admin shutdown, 53300 too many connections
            Some(code) => {
                code.starts_with("08")
                    || code == "40001"
                    || code == "40P01"
                    || code == "57P01"
                    || code == "53300"
            }
            None => false,
        },
        _ => false,
    }
}

fn is_transient_error(error: &Error) -> bool {
    match error {
        Error::Sqlx(e) => is_transient(e),
        _ => false,
    }
}

/// Runs `operation` up to [`MAX_ATTEMPTS`] times while it fails with a transient database error.
///
/// Only wrap idempotent work: reads, or writes that are safe to repeat.
pub async fn with_retry<T, F, Fut>(mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_ATTEMPTS && is_transient_error(&e) => {
                tracing::warn!(attempt, error = %e, "Transient database error, retrying");
                let jitter = Duration::from_millis(rand::random_range(0..50));
                tokio::time::sleep(RETRY_BACKOFF * attempt + jitter).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Acquires a pooled connection, retrying transient acquisition failures.
pub async fn acquire(pool: &DbPool) -> Result<PooledConn> {
    with_retry(|| async { pool.acquire().await.map_err(Error::Sqlx) }).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset"
        ))));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
        assert!(!is_transient(&sqlx::Error::ColumnNotFound("id".to_string())));
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retry(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(Error::Sqlx(sqlx::Error::PoolTimedOut))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Sqlx(sqlx::Error::PoolTimedOut))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::NotFound("missing".to_string()))
        })
        .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

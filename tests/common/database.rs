use backend::{
    load_config,
    models::users::{NewUser, User, UserType},
    queries::users,
    services::users::hash_password,
};
use secrecy::ExposeSecret;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Password every test account is created with.
pub const TEST_PASSWORD: &str = "Secure123";

/// Connects to the configured database, or `None` when it is unreachable.
async fn connect() -> Option<PgPool> {
    let config = load_config().expect("Failed to load config");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(config.database.connection_string().expose_secret())
        .await
        .ok()?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Test database wrapper for better test isolation
///
/// Every account a test creates uses an email starting with
/// `test_{test_name}`, and those rows (plus everything cascading from them)
/// are removed before and after the test.
///
/// Database tests skip themselves when no database is reachable:
///
/// ```rust
/// #[tokio::test]
/// async fn test_something() {
///     let Some(test_db) = TestDb::try_new("test_something").await else {
///         return;
///     };
///     // ... test logic
/// }
/// ```
pub struct TestDb {
    pub pool: PgPool,
    test_prefix: String,
}

impl TestDb {
    pub async fn try_new(test_name: &str) -> Option<Self> {
        let Some(pool) = connect().await else {
            eprintln!("Skipping {test_name}: database not reachable");
            return None;
        };
        let test_prefix = format!("test_{}", test_name);

        // Handles leftovers from an aborted run
        Self::cleanup_prefix(&pool, &test_prefix).await;

        Some(Self { pool, test_prefix })
    }

    pub async fn get_connection(&self) -> sqlx::pool::PoolConnection<sqlx::Postgres> {
        self.pool
            .acquire()
            .await
            .expect("Failed to get database connection")
    }

    pub fn test_prefix(&self) -> &str {
        &self.test_prefix
    }

    /// Generate a unique test email with proper prefix
    pub fn generate_test_email(&self) -> String {
        format!("{}_{}@example.com", self.test_prefix, nanoid::nanoid!(10))
            .to_lowercase()
    }

    async fn cleanup_prefix(pool: &PgPool, prefix: &str) {
        sqlx::query("DELETE FROM users WHERE email LIKE $1")
            .bind(format!("{}%", prefix))
            .execute(pool)
            .await
            .expect("Failed to cleanup test data");
    }

    /// Inserts an active, verified account directly.
    pub async fn create_user(&self, user_type: UserType, first_name: &str) -> User {
        let mut conn = self.get_connection().await;
        users::create_user(
            &mut conn,
            NewUser {
                email: self.generate_test_email(),
                password_hash: hash_password(TEST_PASSWORD).unwrap(),
                first_name: first_name.to_string(),
                last_name: "Prueba".to_string(),
                phone_number: None,
                address: None,
                user_type,
                is_verified: true,
                is_active: true,
            },
        )
        .await
        .expect("Failed to create test user")
    }

    /// Activates an account registered through the API.
    #[allow(dead_code)]
    pub async fn activate(&self, email: &str) {
        sqlx::query("UPDATE users SET is_active = TRUE, is_verified = TRUE WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await
            .expect("Failed to activate test user");
    }

    #[allow(dead_code)]
    pub async fn user_exists(&self, email: &str) -> bool {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to query users")
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let pool = self.pool.clone();
        let prefix = self.test_prefix.clone();
        tokio::spawn(async move {
            let _ = sqlx::query("DELETE FROM users WHERE email LIKE $1")
                .bind(format!("{}%", prefix))
                .execute(&pool)
                .await;
        });
    }
}

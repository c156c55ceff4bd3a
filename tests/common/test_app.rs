use backend::{build_router, database, load_config, AppState, Config, DbPool};
use reqwest::{redirect::Policy, Client, RequestBuilder};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// HTTP test application wrapper
///
/// Runs the full router (middleware stack included) on a random port. The
/// pool connects lazily, so tests that never reach the database run without
/// one.
pub struct TestApp {
    /// Server base URL (e.g., "http://127.0.0.1:54321")
    pub address: String,
    /// HTTP client for making requests
    pub client: Client,
    /// Application config
    pub config: Config,
    pub pool: DbPool,
}

/// Knobs for tests that need a non-default configuration.
#[derive(Debug, Clone, Default)]
pub struct TestAppOptions {
    /// Overrides `rate_limit.max_requests` and enables the limiter
    pub rate_limit: Option<u32>,
    /// Overrides `server.frontend_url`
    pub frontend_url: Option<String>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::new_with_options(TestAppOptions::default()).await
    }

    /// Create a new HTTP test app with server on random port
    ///
    /// # How it works:
    /// 1. Loads config from the environment (or defaults)
    /// 2. Builds the production router via `build_router`
    /// 3. Binds to port 0 (OS assigns random available port)
    /// 4. Starts server in background task
    /// 5. Creates reqwest client configured for testing
    pub async fn new_with_options(options: TestAppOptions) -> Self {
        let mut config = load_config().expect("Failed to load config");
        config.email.enabled = false;
        config.reminders.enabled = false;
        match options.rate_limit {
            Some(max_requests) => {
                config.rate_limit.enabled = true;
                config.rate_limit.max_requests = max_requests;
            }
            // Tests share one loopback IP
            None => config.rate_limit.enabled = false,
        }
        if let Some(frontend_url) = options.frontend_url {
            config.server.frontend_url = frontend_url;
        }

        let pool = database::create_pool(&config.database).expect("Failed to create pool");
        let state = AppState::new(pool.clone(), config.clone()).expect("Failed to build state");
        let app = build_router(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{port}");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Give server time to start
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let client = Client::builder()
            .redirect(Policy::none())
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            address,
            client,
            config,
            pool,
        }
    }

    /// Get the full URL for an API endpoint
    ///
    /// # Example
    /// ```rust
    /// let url = app.url("/api/v1/health");
    /// // Returns: "http://127.0.0.1:54321/api/v1/health"
    /// ```
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    #[allow(dead_code)]
    pub fn get_as(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    #[allow(dead_code)]
    pub fn post_as(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    #[allow(dead_code)]
    pub fn put_as(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token)
    }

    #[allow(dead_code)]
    pub fn patch_as(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.patch(self.url(path)).bearer_auth(token)
    }

    #[allow(dead_code)]
    pub fn delete_as(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }
}

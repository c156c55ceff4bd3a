/// Cookie holding the access token for browser clients
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie security configuration
///
/// Controls how the access token cookie is created for browser clients
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// HttpOnly flag prevents JavaScript access (XSS protection)
    pub http_only: bool,
    /// Secure flag ensures HTTPS-only transmission
    pub secure: bool,
    /// SameSite attribute for CSRF protection
    pub same_site: SameSite,
    pub path: String,
}

/// SameSite cookie attribute for CSRF protection
#[derive(Debug, Clone, Copy)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: false,
            same_site: SameSite::Lax,
            path: "/".to_string(),
        }
    }
}

impl CookieConfig {
    /// Secure cookies whenever the public backend URL is served over HTTPS.
    pub fn for_backend_url(backend_url: &str) -> Self {
        Self {
            secure: backend_url.starts_with("https://"),
            ..Self::default()
        }
    }
}

/// Builds a Set-Cookie header value for the access token
///
/// # Example
/// ```rust
/// use backend::services::cookies::{build_access_token_cookie, CookieConfig};
///
/// let cookie = build_access_token_cookie("my_token", 604800, &CookieConfig::default());
/// assert_eq!(cookie, "access_token=my_token; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800");
/// ```
pub fn build_access_token_cookie(token: &str, max_age_seconds: i64, config: &CookieConfig) -> String {
    format!(
        "{}={}{}{}; SameSite={}; Path={}; Max-Age={}",
        ACCESS_TOKEN_COOKIE,
        token,
        if config.http_only { "; HttpOnly" } else { "" },
        if config.secure { "; Secure" } else { "" },
        config.same_site.as_str(),
        config.path,
        max_age_seconds
    )
}

/// Builds a Set-Cookie header value that clears the access token
pub fn build_clear_token_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", ACCESS_TOKEN_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_access_token_cookie() {
        let cookie = build_access_token_cookie("my-token", 3600, &CookieConfig::default());
        assert!(cookie.contains("access_token=my-token"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_https_backend_gets_secure_cookie() {
        let config = CookieConfig::for_backend_url("https://api.nannyslm.com");
        let cookie = build_access_token_cookie("my-token", 60, &config);
        assert!(cookie.contains("; Secure"));
    }

    #[test]
    fn test_build_clear_token_cookie() {
        let cookie = build_clear_token_cookie();
        assert!(cookie.starts_with("access_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// VAPID public key handed to browsers before they subscribe.
    pub vapid_public_key: Option<String>,
    pub crm: CrmConfig,
}

/// Access to the CRM's contact API, used to resolve message assignees.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub base_url: String,
    pub token: Option<String>,
}

pub const DEFAULT_CRM_API_BASE_URL: &str = "https://services.leadconnectorhq.com";

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                                 |
    /// |-----------------------------|-----------------------------------------|
    /// | `HOST`                      | `0.0.0.0`                               |
    /// | `PORT`                      | `3000`                                  |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`                 |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                                    |
    /// | `WEB_PUSH_VAPID_PUBLIC_KEY` | unset                                   |
    /// | `CRM_API_BASE_URL`          | `https://services.leadconnectorhq.com`  |
    /// | `CRM_API_TOKEN`             | unset                                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let vapid_public_key = std::env::var("WEB_PUSH_VAPID_PUBLIC_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let crm = CrmConfig {
            base_url: std::env::var("CRM_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_CRM_API_BASE_URL.into()),
            token: std::env::var("CRM_API_TOKEN").ok(),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            vapid_public_key,
            crm,
        }
    }
}

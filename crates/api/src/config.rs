use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except secrets have defaults suitable for local development.
/// Loaded once in `main` and passed around behind `Arc`; nothing reads the
/// environment after startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Public base URL used in verification links (default: local bind).
    pub base_url: String,
    /// Amount of currency equal to one account credit (default: `1.0`).
    pub credit_unit_value: f64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Payment processor API settings.
    pub processor: ProcessorConfig,
    /// Google OAuth app credentials, if configured.
    pub google: Option<OAuthAppConfig>,
    /// Facebook OAuth app credentials, if configured.
    pub facebook: Option<OAuthAppConfig>,
    /// SMTP settings; `None` disables outbound verification mail.
    pub smtp: Option<SmtpConfig>,
}

/// Payment processor API settings.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Processor REST base URL (default: `https://api.mercadopago.com`).
    pub base_url: String,
    /// Bearer token for the processor API.
    pub access_token: String,
    /// Outbound request timeout in seconds (default: `10`).
    pub timeout_secs: u64,
}

/// One OAuth application registration.
#[derive(Debug, Clone)]
pub struct OAuthAppConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// SMTP relay settings for verification mail.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Required | Default                     |
    /// |---------------------------|----------|-----------------------------|
    /// | `HOST`                    | no       | `0.0.0.0`                   |
    /// | `PORT`                    | no       | `8000`                      |
    /// | `CORS_ORIGINS`            | no       | `http://localhost:5173`     |
    /// | `REQUEST_TIMEOUT_SECS`    | no       | `30`                        |
    /// | `BASE_URL`                | no       | `http://localhost:8000`     |
    /// | `CREDIT_UNIT_VALUE`       | no       | `1.0`                       |
    /// | `JWT_SECRET` (+ expiry)   | **yes**  | see [`JwtConfig::from_env`] |
    /// | `PROCESSOR_ACCESS_TOKEN`  | **yes**  | --                          |
    /// | `PROCESSOR_BASE_URL`      | no       | `https://api.mercadopago.com` |
    /// | `PROCESSOR_TIMEOUT_SECS`  | no       | `10`                        |
    /// | `GOOGLE_CLIENT_ID/SECRET` | no       | unset disables the provider |
    /// | `FACEBOOK_CLIENT_ID/SECRET` | no     | unset disables the provider |
    /// | `SMTP_SERVER/PORT/USERNAME/PASSWORD/EMAIL_FROM` | no | unset disables mail |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
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

        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let credit_unit_value: f64 = std::env::var("CREDIT_UNIT_VALUE")
            .unwrap_or_else(|_| "1.0".into())
            .parse()
            .expect("CREDIT_UNIT_VALUE must be a valid f64");
        assert!(
            credit_unit_value > 0.0,
            "CREDIT_UNIT_VALUE must be positive"
        );

        let processor = ProcessorConfig {
            base_url: std::env::var("PROCESSOR_BASE_URL")
                .unwrap_or_else(|_| "https://api.mercadopago.com".into()),
            access_token: std::env::var("PROCESSOR_ACCESS_TOKEN")
                .expect("PROCESSOR_ACCESS_TOKEN must be set in the environment"),
            timeout_secs: std::env::var("PROCESSOR_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .expect("PROCESSOR_TIMEOUT_SECS must be a valid u64"),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            base_url,
            credit_unit_value,
            jwt: JwtConfig::from_env(),
            processor,
            google: oauth_app_from_env("GOOGLE"),
            facebook: oauth_app_from_env("FACEBOOK"),
            smtp: smtp_from_env(),
        }
    }
}

/// Read `{PREFIX}_CLIENT_ID` / `{PREFIX}_CLIENT_SECRET`; both present or the
/// provider stays disabled.
fn oauth_app_from_env(prefix: &str) -> Option<OAuthAppConfig> {
    let client_id = std::env::var(format!("{prefix}_CLIENT_ID")).ok()?;
    let client_secret = std::env::var(format!("{prefix}_CLIENT_SECRET")).ok()?;
    Some(OAuthAppConfig {
        client_id,
        client_secret,
    })
}

fn smtp_from_env() -> Option<SmtpConfig> {
    let server = std::env::var("SMTP_SERVER").ok()?;
    let username = std::env::var("SMTP_USERNAME").ok()?;
    let password = std::env::var("SMTP_PASSWORD").ok()?;
    let from = std::env::var("EMAIL_FROM").ok()?;
    let port: u16 = std::env::var("SMTP_PORT")
        .unwrap_or_else(|_| "587".into())
        .parse()
        .expect("SMTP_PORT must be a valid u16");
    Some(SmtpConfig {
        server,
        port,
        username,
        password,
        from,
    })
}

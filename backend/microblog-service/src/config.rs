/// Configuration management for MicroBlog Service
///
/// All settings come from environment variables (optionally seeded from a
/// `.env` file by the binary). Missing values fall back to development
/// defaults; a handful of settings are mandatory when `APP_ENV=production`.
use db_pool::env_utils::{env_non_empty, parse_env_bool, parse_env_with_default};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Session cookie configuration
    pub session: SessionConfig,
    /// External identity provider; `None` disables `/auth/google`
    pub oauth: Option<OAuthConfig>,
    /// Generated avatar dimensions
    pub avatar: AvatarConfig,
    /// Post media upload limits
    pub uploads: UploadConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token
    pub cookie_name: String,
    /// Session lifetime in hours
    pub ttl_hours: i64,
    /// Set the `Secure` attribute on the cookie
    pub secure_cookie: bool,
}

/// Google OAuth client settings
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub redirect_uri: String,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upper bound for a single image or video part
    pub max_media_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "sid".to_string(),
            ttl_hours: 24 * 7,
            secure_cookie: false,
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_media_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let is_production = app_env.eq_ignore_ascii_case("production");

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("MICROBLOG_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_with_default("MICROBLOG_PORT", 3000),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://microblog.db?mode=rwc".to_string()),
                max_connections: parse_env_with_default("DATABASE_MAX_CONNECTIONS", 5),
            },
            session: {
                let defaults = SessionConfig::default();
                let secure_cookie = parse_env_bool("SESSION_COOKIE_SECURE", is_production);
                if is_production && !secure_cookie {
                    return Err("SESSION_COOKIE_SECURE cannot be disabled in production".to_string());
                }

                let ttl_hours = parse_env_with_default("SESSION_TTL_HOURS", defaults.ttl_hours);
                if ttl_hours <= 0 {
                    return Err(format!("SESSION_TTL_HOURS must be positive, got {}", ttl_hours));
                }

                SessionConfig {
                    cookie_name: env_non_empty("SESSION_COOKIE_NAME")
                        .unwrap_or(defaults.cookie_name),
                    ttl_hours,
                    secure_cookie,
                }
            },
            oauth: parse_oauth_config()?,
            avatar: {
                let size: u32 = parse_env_with_default("AVATAR_SIZE", 100);
                if size == 0 {
                    return Err("AVATAR_SIZE must be greater than zero".to_string());
                }
                AvatarConfig {
                    width: size,
                    height: size,
                }
            },
            uploads: UploadConfig {
                max_media_bytes: parse_env_with_default(
                    "UPLOAD_MAX_BYTES",
                    UploadConfig::default().max_media_bytes,
                ),
            },
        })
    }
}

/// Google settings are all-or-nothing: a partial set is a deployment mistake
fn parse_oauth_config() -> Result<Option<OAuthConfig>, String> {
    let client_id = env_non_empty("GOOGLE_CLIENT_ID");
    let client_secret = env_non_empty("GOOGLE_CLIENT_SECRET");
    let redirect_uri = env_non_empty("GOOGLE_REDIRECT_URI");

    match (client_id, client_secret, redirect_uri) {
        (Some(client_id), Some(client_secret), Some(redirect_uri)) => Ok(Some(OAuthConfig {
            client_id,
            client_secret,
            redirect_uri,
        })),
        (None, None, None) => Ok(None),
        _ => Err(
            "GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REDIRECT_URI must be set together"
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "MICROBLOG_HOST",
        "MICROBLOG_PORT",
        "DATABASE_URL",
        "DATABASE_MAX_CONNECTIONS",
        "SESSION_COOKIE_SECURE",
        "SESSION_COOKIE_NAME",
        "SESSION_TTL_HOURS",
        "GOOGLE_CLIENT_ID",
        "GOOGLE_CLIENT_SECRET",
        "GOOGLE_REDIRECT_URI",
        "AVATAR_SIZE",
        "UPLOAD_MAX_BYTES",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_for_development() {
        clear_env();

        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 3000);
        assert_eq!(config.session.cookie_name, "sid");
        assert!(!config.session.secure_cookie);
        assert!(config.oauth.is_none());
        assert_eq!(config.avatar.width, 100);
        assert_eq!(config.avatar.height, 100);
    }

    #[test]
    #[serial]
    fn production_requires_secure_cookie() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("SESSION_COOKIE_SECURE", "false");

        let err = Config::from_env().unwrap_err();
        assert!(err.contains("SESSION_COOKIE_SECURE"));

        std::env::remove_var("SESSION_COOKIE_SECURE");
        let config = Config::from_env().unwrap();
        assert!(config.session.secure_cookie);

        clear_env();
    }

    #[test]
    #[serial]
    fn partial_oauth_settings_are_rejected() {
        clear_env();
        std::env::set_var("GOOGLE_CLIENT_ID", "client");

        assert!(Config::from_env().is_err());

        std::env::set_var("GOOGLE_CLIENT_SECRET", "secret");
        std::env::set_var("GOOGLE_REDIRECT_URI", "http://localhost:3000/auth/google/callback");
        let config = Config::from_env().unwrap();
        let oauth = config.oauth.unwrap();
        assert_eq!(oauth.client_id, "client");
        assert!(!format!("{:?}", oauth).contains("\"secret\""));

        clear_env();
    }

    #[test]
    #[serial]
    fn avatar_size_must_be_positive() {
        clear_env();
        std::env::set_var("AVATAR_SIZE", "0");
        assert!(Config::from_env().is_err());
        clear_env();
    }
}

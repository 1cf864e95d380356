use std::{fmt, fs, path::PathBuf};

use crate::auth::{CookieConfig, SameSite, SecretError, SigningSecret};
use crate::cors::{CorsPolicy, CorsPolicyError};
use crate::db::DatabaseConfig;

/// Startup configuration problems. All of them are fatal: the process must not
/// start serving protected routes.
#[derive(Debug)]
pub enum ConfigError {
    MissingSecret,
    Secret(SecretError),
    SecretFile { path: PathBuf, message: String },
    Cors(CorsPolicyError),
    InsecureSameSiteNone,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSecret => write!(
                f,
                "no signing secret configured (set JWT_SECRET or JWT_SECRET_FILE)"
            ),
            Self::Secret(err) => write!(f, "{}", err),
            Self::SecretFile { path, message } => write!(
                f,
                "failed to read signing secret from {}: {}",
                path.display(),
                message
            ),
            Self::Cors(err) => write!(f, "{}", err),
            Self::InsecureSameSiteNone => {
                write!(f, "SameSite=None cookies must also be Secure")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<SecretError> for ConfigError {
    fn from(err: SecretError) -> Self {
        Self::Secret(err)
    }
}

impl From<CorsPolicyError> for ConfigError {
    fn from(err: CorsPolicyError) -> Self {
        Self::Cors(err)
    }
}

/// Resolve the signing secret. An inline value wins over a file; a file's
/// trailing newline is ignored.
pub fn load_secret(
    inline: Option<String>,
    file: Option<PathBuf>,
) -> Result<SigningSecret, ConfigError> {
    if let Some(secret) = inline {
        return Ok(SigningSecret::new(secret.into_bytes())?);
    }

    if let Some(path) = file {
        let raw = fs::read_to_string(&path).map_err(|e| ConfigError::SecretFile {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let trimmed = raw.trim_end_matches(['\r', '\n']);
        return Ok(SigningSecret::new(trimmed.as_bytes().to_vec())?);
    }

    Err(ConfigError::MissingSecret)
}

/// Everything the HTTP server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub secret: SigningSecret,
    pub cookies: CookieConfig,
    pub cors: CorsPolicy,
}

impl ServerConfig {
    /// Defaults for everything except the secret, which has none.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database: DatabaseConfig::default(),
            secret,
            cookies: CookieConfig::default(),
            cors: CorsPolicy::default(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cors.validate()?;
        if self.cookies.same_site == SameSite::None && !self.cookies.secure {
            return Err(ConfigError::InsecureSameSiteNone);
        }
        Ok(())
    }
}

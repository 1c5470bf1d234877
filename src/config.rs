use anyhow::{Context, Result};

use crate::secret_codec::SecretCodec;

/// Process settings read from the environment (after `.env` is loaded).
#[derive(Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub codec: SecretCodec,
    pub sentry_dsn: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let codec = codec_from_env()?;
        let sentry_dsn = std::env::var("SENTRY_DSN")
            .ok()
            .filter(|dsn| !dsn.is_empty());

        Ok(Self {
            database_url,
            jwt_secret,
            codec,
            sentry_dsn,
        })
    }
}

/// `GATEWAY_ENCRYPTION_KEY`: 64 hex characters (a 32-byte AES key).
pub fn codec_from_env() -> Result<SecretCodec> {
    let key = std::env::var("GATEWAY_ENCRYPTION_KEY")
        .context("GATEWAY_ENCRYPTION_KEY must be set")?;
    SecretCodec::from_hex(&key).context("GATEWAY_ENCRYPTION_KEY is invalid")
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("database_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("sentry_dsn", &self.sentry_dsn.is_some())
            .finish()
    }
}

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Server settings, read from `STOREFRONT_*` environment variables
/// (a `.env` file is loaded first if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub secure_cookies: bool,
    /// Promoted to admin at startup when such a user exists.
    pub admin_email: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("STOREFRONT_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("STOREFRONT_PORT is not a valid port: {raw}"))?,
            None => 3000,
        };
        let secure_cookies = match lookup("STOREFRONT_SECURE_COOKIES").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => anyhow::bail!("STOREFRONT_SECURE_COOKIES must be true or false, got {other}"),
        };

        Ok(Self {
            db_path: lookup("STOREFRONT_DB_PATH")
                .unwrap_or_else(|| "storefront.db".into())
                .into(),
            host: lookup("STOREFRONT_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            secure_cookies,
            admin_email: lookup("STOREFRONT_ADMIN_EMAIL").filter(|e| !e.trim().is_empty()),
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

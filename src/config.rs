// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. A missing or
//! malformed `ENCRYPTION_KEY` is fatal: the server refuses to start rather
//! than run without a usable key.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENCRYPTION_KEY` | AES-256 key, 64 hex characters | **required** |
//! | `DATA_DIR` | Root directory for JSON storage | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PUBLIC_APP_URL` | Base URL of the web app, used in access links | `http://localhost:3000` |
//! | `AUTH_JWKS_URL` | JWKS endpoint for JWT verification | unset: development mode |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Optional |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `TLS_CERT_PATH` | PEM certificate chain | unset: plain HTTP |
//! | `TLS_KEY_PATH` | PEM private key | unset: plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::crypto::{CipherError, EncryptionKey};
use crate::storage::paths::DATA_ROOT;

pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PUBLIC_APP_URL_ENV: &str = "PUBLIC_APP_URL";
pub const AUTH_JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";
pub const AUTH_AUDIENCE_ENV: &str = "AUTH_AUDIENCE";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PUBLIC_APP_URL: &str = "http://localhost:3000";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{ENCRYPTION_KEY_ENV} is invalid: {0}")]
    InvalidKey(#[source] CipherError),

    #[error("{var} is invalid: {value}")]
    Invalid { var: &'static str, value: String },

    #[error("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together")]
    IncompleteTls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Read `LOG_FORMAT` directly; logging starts before the rest of the config.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// JWT verification settings.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub encryption_key: EncryptionKey,
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub public_app_url: Url,
    pub auth: AuthSettings,
    pub tls: Option<TlsPaths>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from a variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let encryption_key = var(ENCRYPTION_KEY_ENV)
            .ok_or(ConfigError::Missing(ENCRYPTION_KEY_ENV))
            .and_then(|hex| EncryptionKey::from_hex(&hex).map_err(ConfigError::InvalidKey))?;

        let data_dir = PathBuf::from(var(DATA_DIR_ENV).unwrap_or_else(|| DATA_ROOT.to_string()));

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host.parse().map_err(|_| ConfigError::Invalid {
            var: HOST_ENV,
            value: host.clone(),
        })?;

        let port = match var(PORT_ENV) {
            Some(port) => port.parse().map_err(|_| ConfigError::Invalid {
                var: PORT_ENV,
                value: port,
            })?,
            None => DEFAULT_PORT,
        };

        let public_app_url = var(PUBLIC_APP_URL_ENV).unwrap_or_else(|| DEFAULT_PUBLIC_APP_URL.to_string());
        let public_app_url = Url::parse(&public_app_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or(ConfigError::Invalid {
                var: PUBLIC_APP_URL_ENV,
                value: public_app_url,
            })?;

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        Ok(Self {
            encryption_key,
            data_dir,
            bind_addr: SocketAddr::new(ip, port),
            public_app_url,
            auth: AuthSettings {
                jwks_url: var(AUTH_JWKS_URL_ENV),
                issuer: var(AUTH_ISSUER_ENV),
                audience: var(AUTH_AUDIENCE_ENV),
            },
            tls,
        })
    }
}

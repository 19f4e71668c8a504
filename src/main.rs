// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use digital_wallet_server::{
    api::router,
    auth::JwksManager,
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    crypto::FieldCipher,
    maintenance::MaintenanceSweeper,
    state::{AppState, AuthConfig},
    storage::JsonStorage,
};

#[tokio::main]
async fn main() {
    init_tracing(LogFormat::from_env());

    // A missing or malformed ENCRYPTION_KEY stops the process here.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let storage = match JsonStorage::open(&config.data_dir) {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!(data_dir = %config.data_dir.display(), error = %e, "Failed to open storage");
            std::process::exit(1);
        }
    };
    tracing::info!(data_dir = %config.data_dir.display(), "Storage ready");

    let auth_config = build_auth_config(&config).await;
    let cipher = FieldCipher::new(config.encryption_key.clone());
    let state = AppState::new(storage, cipher, config.public_app_url.clone())
        .with_auth_config(auth_config);

    let shutdown = CancellationToken::new();
    let sweeper = MaintenanceSweeper::new(state.storage.clone(), state.public_app_url.clone());
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.clone()));

    let app = router(state);
    let addr = config.bind_addr;

    let served = match &config.tls {
        Some(tls) => {
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                tracing::warn!("rustls crypto provider was already installed");
            }
            let tls_config = match RustlsConfig::from_pem_file(&tls.cert, &tls.key).await {
                Ok(tls_config) => tls_config,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load TLS certificate or key");
                    std::process::exit(1);
                }
            };

            let handle = axum_server::Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                let shutdown = shutdown.clone();
                async move {
                    shutdown_signal().await;
                    shutdown.cancel();
                    handle.graceful_shutdown(Some(Duration::from_secs(10)));
                }
            });

            tracing::info!(%addr, "Digital wallet server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    tracing::error!(%addr, error = %e, "Failed to bind");
                    std::process::exit(1);
                }
            };

            tracing::info!(%addr, "Digital wallet server listening on http (docs at /docs)");
            let shutdown = shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_signal().await;
                    shutdown.cancel();
                })
                .await
        }
    };

    if let Err(e) = served {
        tracing::error!(error = %e, "Server error");
    }

    shutdown.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweeper_handle).await;
    tracing::info!("Graceful shutdown complete");
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Production mode when a JWKS URL is configured, development mode otherwise.
async fn build_auth_config(config: &AppConfig) -> AuthConfig {
    let Some(jwks_url) = config.auth.jwks_url.as_deref() else {
        tracing::warn!("AUTH_JWKS_URL not set: JWT signatures are NOT verified (development mode)");
        return AuthConfig::default();
    };

    let jwks = match JwksManager::new(jwks_url) {
        Ok(jwks) => jwks,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize JWKS manager");
            std::process::exit(1);
        }
    };
    if let Err(e) = jwks.refresh().await {
        tracing::warn!(error = %e, "Initial JWKS fetch failed; will retry on first request");
    }
    tracing::info!(jwks_url, "JWT verification enabled");

    AuthConfig {
        jwks: Some(jwks),
        issuer: config.auth.issuer.clone(),
        audience: config.auth.audience.clone(),
    }
}

/// Wait for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}

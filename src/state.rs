// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use url::Url;

use crate::auth::JwksManager;
use crate::crypto::FieldCipher;
use crate::storage::JsonStorage;

/// JWT verification settings. `jwks: None` means development mode.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub jwks: Option<JwksManager>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<JsonStorage>,
    pub cipher: Arc<FieldCipher>,
    pub auth_config: AuthConfig,
    /// Base for links embedded in access grants.
    pub public_app_url: Arc<Url>,
}

impl AppState {
    pub fn new(storage: JsonStorage, cipher: FieldCipher, public_app_url: Url) -> Self {
        Self {
            storage: Arc::new(storage),
            cipher: Arc::new(cipher),
            auth_config: AuthConfig::default(),
            public_app_url: Arc::new(public_app_url),
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    pub fn storage(&self) -> &JsonStorage {
        &self.storage
    }

    pub fn cipher(&self) -> &FieldCipher {
        &self.cipher
    }
}

/// State over a fresh temp directory, random key, development-mode auth.
#[cfg(test)]
pub fn test_state() -> (AppState, tempfile::TempDir) {
    use crate::crypto::EncryptionKey;

    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let storage = JsonStorage::open(temp_dir.path()).expect("Failed to initialize storage");
    let url = Url::parse("http://localhost:3000").expect("valid url");
    let state = AppState::new(storage, FieldCipher::new(EncryptionKey::generate()), url);
    (state, temp_dir)
}

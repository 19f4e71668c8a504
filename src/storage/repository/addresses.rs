// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Address repository.
//!
//! Line 1, line 2, city and ZIP code are sealed. Line 3, landmark, state and
//! country are stored in clear.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{paths::validate_id, JsonStorage, StorageError, StorageResult};
use super::{apply_plain, plain};
use crate::crypto::FieldCipher;
use crate::models::{AddressView, CreateAddressRequest, UpdateAddressRequest};

/// Address as persisted on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredAddress {
    pub id: String,
    /// Owner user ID.
    pub user: String,
    pub encrypted_line1: Option<String>,
    pub line1_iv: Option<String>,
    pub encrypted_line2: Option<String>,
    pub line2_iv: Option<String>,
    pub encrypted_city: Option<String>,
    pub city_iv: Option<String>,
    pub encrypted_zip_code: Option<String>,
    pub zip_code_iv: Option<String>,
    pub line3: Option<String>,
    pub landmark: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::sealed_fields!(StoredAddress {
    line1 / set_line1 => (encrypted_line1, line1_iv), "Encrypted";
    line2 / set_line2 => (encrypted_line2, line2_iv), "Encrypted";
    city / set_city => (encrypted_city, city_iv), "Encrypted";
    zip_code / set_zip_code => (encrypted_zip_code, zip_code_iv), "Encrypted";
});

impl StoredAddress {
    pub fn new(cipher: &FieldCipher, user_id: &str, request: &CreateAddressRequest) -> Self {
        let now = Utc::now();
        let mut address = Self {
            id: uuid::Uuid::new_v4().to_string(),
            user: user_id.to_string(),
            line3: plain(request.line3.as_deref()),
            landmark: plain(request.landmark.as_deref()),
            state: plain(request.state.as_deref()),
            country: plain(request.country.as_deref()),
            created_at: now,
            updated_at: now,
            ..Default::default()
        };

        address.set_line1(cipher, Some(&request.line1));
        address.set_line2(cipher, request.line2.as_deref());
        address.set_city(cipher, request.city.as_deref());
        address.set_zip_code(cipher, request.zip_code.as_deref());
        address
    }

    /// Apply a partial update. `None` leaves a field untouched, `""` clears it.
    pub fn apply_update(&mut self, cipher: &FieldCipher, update: &UpdateAddressRequest) {
        if let Some(line1) = update.line1.as_deref() {
            self.set_line1(cipher, Some(line1));
        }
        if let Some(line2) = update.line2.as_deref() {
            self.set_line2(cipher, Some(line2));
        }
        if let Some(city) = update.city.as_deref() {
            self.set_city(cipher, Some(city));
        }
        if let Some(zip_code) = update.zip_code.as_deref() {
            self.set_zip_code(cipher, Some(zip_code));
        }
        apply_plain(&mut self.line3, update.line3.as_deref());
        apply_plain(&mut self.landmark, update.landmark.as_deref());
        apply_plain(&mut self.state, update.state.as_deref());
        apply_plain(&mut self.country, update.country.as_deref());
        self.updated_at = Utc::now();
    }

    pub fn to_view(&self, cipher: &FieldCipher) -> AddressView {
        AddressView {
            id: self.id.clone(),
            user_id: self.user.clone(),
            line1: self.line1(cipher),
            line2: self.line2(cipher),
            line3: self.line3.clone(),
            landmark: self.landmark.clone(),
            city: self.city(cipher),
            state: self.state.clone(),
            zip_code: self.zip_code(cipher),
            country: self.country.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for address operations.
pub struct AddressRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> AddressRepository<'a> {
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    /// Ids come from request paths and become file names.
    fn path(&self, address_id: &str) -> StorageResult<PathBuf> {
        validate_id(address_id)?;
        Ok(self.storage.paths().address(address_id))
    }

    pub fn exists(&self, address_id: &str) -> bool {
        self.path(address_id).is_ok_and(|path| self.storage.exists(path))
    }

    pub fn get(&self, address_id: &str) -> StorageResult<StoredAddress> {
        let path = self.path(address_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Address {address_id}")));
        }
        self.storage.read_json(path)
    }

    /// Get a record that must belong to `owner_user_id`.
    ///
    /// A record owned by someone else is reported as not found.
    pub fn get_owned(&self, address_id: &str, owner_user_id: &str) -> StorageResult<StoredAddress> {
        let address = self.get(address_id)?;
        if address.user != owner_user_id {
            return Err(StorageError::NotFound(format!("Address {address_id}")));
        }
        Ok(address)
    }

    pub fn create(&self, address: &StoredAddress) -> StorageResult<()> {
        let path = self.path(&address.id)?;
        if self.storage.exists(&path) {
            return Err(StorageError::AlreadyExists(format!("Address {}", address.id)));
        }
        self.storage.write_json(path, address)
    }

    /// Apply `change` to a record of `owner_user_id` as one locked
    /// read-modify-write, so concurrent edits cannot overwrite each other.
    pub fn update_owned<F>(
        &self,
        address_id: &str,
        owner_user_id: &str,
        change: F,
    ) -> StorageResult<StoredAddress>
    where
        F: FnOnce(&mut StoredAddress),
    {
        let path = self.path(address_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Address {address_id}")));
        }
        self.storage.update_json(path, |address: &mut StoredAddress| {
            if address.user != owner_user_id {
                return Err(StorageError::NotFound(format!("Address {address_id}")));
            }
            change(address);
            Ok(address.clone())
        })
    }

    pub fn delete(&self, address_id: &str) -> StorageResult<()> {
        let path = self.path(address_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Address {address_id}")));
        }
        self.storage.delete(path)
    }

    pub fn list_by_owner(&self, owner_user_id: &str) -> StorageResult<Vec<StoredAddress>> {
        let mut addresses: Vec<StoredAddress> = self
            .storage
            .load_all(self.storage.paths().addresses_dir())?
            .into_iter()
            .filter(|address: &StoredAddress| address.user == owner_user_id)
            .collect();
        addresses.sort_by_key(|address| address.created_at);
        Ok(addresses)
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card repository.
//!
//! Each card is stored as a separate JSON file under `cards/`. The number,
//! CVV, holder, expiry, card PIN and issuing bank are sealed fields; `last4`
//! is kept in clear so the masked number can be shown without decrypting.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{paths::validate_id, JsonStorage, StorageError, StorageResult};
use super::{apply_plain, plain};
use crate::crypto::{sealed, FieldCipher};
use crate::models::{CardView, CreateCardRequest, UpdateCardRequest};

/// Placeholder shown for a stored CVV.
pub const CVV_MASK: &str = "***";
/// Placeholder shown for a stored card PIN.
pub const PIN_MASK: &str = "****";

/// Card as persisted on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredCard {
    pub id: String,
    /// Owner user ID.
    pub user: String,
    pub encrypted_number: Option<String>,
    pub iv: Option<String>,
    pub last4: Option<String>,
    pub encrypted_cvv: Option<String>,
    pub cvv_iv: Option<String>,
    pub encrypted_holder: Option<String>,
    pub holder_iv: Option<String>,
    pub encrypted_expiry: Option<String>,
    pub expiry_iv: Option<String>,
    pub encrypted_pin: Option<String>,
    pub pin_iv: Option<String>,
    pub encrypted_bank: Option<String>,
    pub bank_iv: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub theme: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::sealed_fields!(StoredCard {
    /// Cardholder name.
    holder / set_holder => (encrypted_holder, holder_iv), "Encrypted";
    /// Expiry as entered (`MM/YY`).
    expiry / set_expiry => (encrypted_expiry, expiry_iv), "**/**";
    /// Issuing bank.
    bank / set_bank => (encrypted_bank, bank_iv), "Encrypted";
    /// Decrypted CVV. Only for the PIN-gated reveal.
    reveal_cvv / set_cvv => (encrypted_cvv, cvv_iv), CVV_MASK;
    /// Decrypted card PIN. Only for the PIN-gated reveal.
    reveal_pin / set_pin => (encrypted_pin, pin_iv), PIN_MASK;
});

impl StoredCard {
    /// Build a new card for `user_id`, sealing every sensitive field.
    pub fn new(cipher: &FieldCipher, user_id: &str, request: &CreateCardRequest) -> Self {
        let now = Utc::now();
        let mut card = Self {
            id: uuid::Uuid::new_v4().to_string(),
            user: user_id.to_string(),
            card_type: plain(request.card_type.as_deref()),
            theme: plain(request.theme.as_deref()),
            category: plain(request.category.as_deref()),
            image: plain(request.image.as_deref()),
            created_at: now,
            updated_at: now,
            ..Default::default()
        };

        card.set_number(cipher, Some(&request.number));
        card.set_cvv(cipher, request.cvv.as_deref());
        card.set_holder(cipher, request.holder.as_deref());
        card.set_expiry(cipher, request.expiry.as_deref());
        card.set_pin(cipher, request.pin.as_deref());
        card.set_bank(cipher, request.bank.as_deref());
        card
    }

    /// Encrypt and store the card number, recording its last four digits.
    pub fn set_number(&mut self, cipher: &FieldCipher, value: Option<&str>) {
        let trimmed = value.map(str::trim).filter(|v| !v.is_empty());
        let (encrypted, iv) = sealed::seal(cipher, trimmed);
        self.encrypted_number = encrypted;
        self.iv = iv;
        self.last4 = trimmed.map(last_four);
    }

    /// Masked number, e.g. `**** **** **** 1111`. Never decrypts.
    pub fn number_display(&self) -> Option<String> {
        if !sealed::is_set(self.encrypted_number.as_deref(), self.iv.as_deref()) {
            return None;
        }
        let last4 = self.last4.as_deref().unwrap_or("****");
        Some(format!("**** **** **** {last4}"))
    }

    /// Decrypted card number. Only for the PIN-gated reveal.
    pub fn reveal_number(&self, cipher: &FieldCipher) -> Option<String> {
        sealed::open_or(
            cipher,
            self.encrypted_number.as_deref(),
            self.iv.as_deref(),
            "number",
            &self.id,
            "****",
        )
    }

    pub fn cvv_display(&self) -> Option<String> {
        sealed::is_set(self.encrypted_cvv.as_deref(), self.cvv_iv.as_deref())
            .then(|| CVV_MASK.to_string())
    }

    pub fn pin_display(&self) -> Option<String> {
        sealed::is_set(self.encrypted_pin.as_deref(), self.pin_iv.as_deref())
            .then(|| PIN_MASK.to_string())
    }

    /// Apply a partial update. `None` leaves a field untouched, `""` clears it.
    pub fn apply_update(&mut self, cipher: &FieldCipher, update: &UpdateCardRequest) {
        if let Some(number) = update.number.as_deref() {
            self.set_number(cipher, Some(number));
        }
        if let Some(cvv) = update.cvv.as_deref() {
            self.set_cvv(cipher, Some(cvv));
        }
        if let Some(holder) = update.holder.as_deref() {
            self.set_holder(cipher, Some(holder));
        }
        if let Some(expiry) = update.expiry.as_deref() {
            self.set_expiry(cipher, Some(expiry));
        }
        if let Some(pin) = update.pin.as_deref() {
            self.set_pin(cipher, Some(pin));
        }
        if let Some(bank) = update.bank.as_deref() {
            self.set_bank(cipher, Some(bank));
        }
        apply_plain(&mut self.card_type, update.card_type.as_deref());
        apply_plain(&mut self.theme, update.theme.as_deref());
        apply_plain(&mut self.category, update.category.as_deref());
        apply_plain(&mut self.image, update.image.as_deref());
        self.updated_at = Utc::now();
    }

    /// Client-facing view: number masked, CVV and PIN as placeholders.
    pub fn to_view(&self, cipher: &FieldCipher) -> CardView {
        CardView {
            id: self.id.clone(),
            user_id: self.user.clone(),
            number: self.number_display(),
            last4: self.last4.clone(),
            cvv: self.cvv_display(),
            holder: self.holder(cipher),
            expiry: self.expiry(cipher),
            pin: self.pin_display(),
            bank: self.bank(cipher),
            card_type: self.card_type.clone(),
            theme: self.theme.clone(),
            category: self.category.clone(),
            image: self.image.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Last four characters of a card number.
fn last_four(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    chars[chars.len().saturating_sub(4)..].iter().collect()
}

/// Repository for card operations.
pub struct CardRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> CardRepository<'a> {
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    /// Ids come from request paths and become file names.
    fn path(&self, card_id: &str) -> StorageResult<PathBuf> {
        validate_id(card_id)?;
        Ok(self.storage.paths().card(card_id))
    }

    pub fn exists(&self, card_id: &str) -> bool {
        self.path(card_id).is_ok_and(|path| self.storage.exists(path))
    }

    pub fn get(&self, card_id: &str) -> StorageResult<StoredCard> {
        let path = self.path(card_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Card {card_id}")));
        }
        self.storage.read_json(path)
    }

    /// Get a record that must belong to `owner_user_id`.
    ///
    /// A record owned by someone else is reported as not found.
    pub fn get_owned(&self, card_id: &str, owner_user_id: &str) -> StorageResult<StoredCard> {
        let card = self.get(card_id)?;
        if card.user != owner_user_id {
            return Err(StorageError::NotFound(format!("Card {card_id}")));
        }
        Ok(card)
    }

    pub fn create(&self, card: &StoredCard) -> StorageResult<()> {
        let path = self.path(&card.id)?;
        if self.storage.exists(&path) {
            return Err(StorageError::AlreadyExists(format!("Card {}", card.id)));
        }
        self.storage.write_json(path, card)
    }

    /// Apply `change` to a record of `owner_user_id` as one locked
    /// read-modify-write, so concurrent edits cannot overwrite each other.
    pub fn update_owned<F>(
        &self,
        card_id: &str,
        owner_user_id: &str,
        change: F,
    ) -> StorageResult<StoredCard>
    where
        F: FnOnce(&mut StoredCard),
    {
        let path = self.path(card_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Card {card_id}")));
        }
        self.storage.update_json(path, |card: &mut StoredCard| {
            if card.user != owner_user_id {
                return Err(StorageError::NotFound(format!("Card {card_id}")));
            }
            change(card);
            Ok(card.clone())
        })
    }

    pub fn delete(&self, card_id: &str) -> StorageResult<()> {
        let path = self.path(card_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Card {card_id}")));
        }
        self.storage.delete(path)
    }

    /// All cards of one user, oldest first.
    pub fn list_by_owner(&self, owner_user_id: &str) -> StorageResult<Vec<StoredCard>> {
        let mut cards: Vec<StoredCard> = self
            .storage
            .load_all(self.storage.paths().cards_dir())?
            .into_iter()
            .filter(|card: &StoredCard| card.user == owner_user_id)
            .collect();
        cards.sort_by_key(|card| card.created_at);
        Ok(cards)
    }
}

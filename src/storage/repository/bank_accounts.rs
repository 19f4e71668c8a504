// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bank account repository.
//!
//! Account holder, account number and IFSC are sealed fields. Branch, account
//! type, MMID and VPA are stored in clear.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::{paths::validate_id, JsonStorage, StorageError, StorageResult};
use super::{apply_plain, plain};
use crate::crypto::FieldCipher;
use crate::models::{BankAccountView, CreateBankAccountRequest, UpdateBankAccountRequest};

/// Bank account as persisted on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredBankAccount {
    pub id: String,
    /// Owner user ID.
    pub user: String,
    pub encrypted_account_holder: Option<String>,
    pub account_holder_iv: Option<String>,
    pub encrypted_account_number: Option<String>,
    pub account_number_iv: Option<String>,
    pub encrypted_ifsc: Option<String>,
    pub ifsc_iv: Option<String>,
    pub branch: Option<String>,
    pub account_type: Option<String>,
    pub theme: Option<String>,
    pub mmid: Option<String>,
    pub vpa: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::sealed_fields!(StoredBankAccount {
    account_holder / set_account_holder => (encrypted_account_holder, account_holder_iv), "Encrypted";
    account_number / set_account_number => (encrypted_account_number, account_number_iv), "****";
    ifsc / set_ifsc => (encrypted_ifsc, ifsc_iv), "Encrypted";
});

impl StoredBankAccount {
    pub fn new(cipher: &FieldCipher, user_id: &str, request: &CreateBankAccountRequest) -> Self {
        let now = Utc::now();
        let mut account = Self {
            id: uuid::Uuid::new_v4().to_string(),
            user: user_id.to_string(),
            branch: plain(request.branch.as_deref()),
            account_type: plain(request.account_type.as_deref()),
            theme: plain(request.theme.as_deref()),
            mmid: plain(request.mmid.as_deref()),
            vpa: plain(request.vpa.as_deref()),
            created_at: now,
            updated_at: now,
            ..Default::default()
        };

        account.set_account_holder(cipher, request.account_holder.as_deref());
        account.set_account_number(cipher, Some(&request.account_number));
        account.set_ifsc(cipher, request.ifsc.as_deref());
        account
    }

    /// Apply a partial update. `None` leaves a field untouched, `""` clears it.
    pub fn apply_update(&mut self, cipher: &FieldCipher, update: &UpdateBankAccountRequest) {
        if let Some(holder) = update.account_holder.as_deref() {
            self.set_account_holder(cipher, Some(holder));
        }
        if let Some(number) = update.account_number.as_deref() {
            self.set_account_number(cipher, Some(number));
        }
        if let Some(ifsc) = update.ifsc.as_deref() {
            self.set_ifsc(cipher, Some(ifsc));
        }
        apply_plain(&mut self.branch, update.branch.as_deref());
        apply_plain(&mut self.account_type, update.account_type.as_deref());
        apply_plain(&mut self.theme, update.theme.as_deref());
        apply_plain(&mut self.mmid, update.mmid.as_deref());
        apply_plain(&mut self.vpa, update.vpa.as_deref());
        self.updated_at = Utc::now();
    }

    pub fn to_view(&self, cipher: &FieldCipher) -> BankAccountView {
        BankAccountView {
            id: self.id.clone(),
            user_id: self.user.clone(),
            account_holder: self.account_holder(cipher),
            account_number: self.account_number(cipher),
            ifsc: self.ifsc(cipher),
            branch: self.branch.clone(),
            account_type: self.account_type.clone(),
            theme: self.theme.clone(),
            mmid: self.mmid.clone(),
            vpa: self.vpa.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Repository for bank account operations.
pub struct BankAccountRepository<'a> {
    storage: &'a JsonStorage,
}

impl<'a> BankAccountRepository<'a> {
    pub fn new(storage: &'a JsonStorage) -> Self {
        Self { storage }
    }

    /// Ids come from request paths and become file names.
    fn path(&self, account_id: &str) -> StorageResult<PathBuf> {
        validate_id(account_id)?;
        Ok(self.storage.paths().bank_account(account_id))
    }

    pub fn exists(&self, account_id: &str) -> bool {
        self.path(account_id).is_ok_and(|path| self.storage.exists(path))
    }

    pub fn get(&self, account_id: &str) -> StorageResult<StoredBankAccount> {
        let path = self.path(account_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Bank account {account_id}")));
        }
        self.storage.read_json(path)
    }

    /// Get a record that must belong to `owner_user_id`.
    ///
    /// A record owned by someone else is reported as not found.
    pub fn get_owned(
        &self,
        account_id: &str,
        owner_user_id: &str,
    ) -> StorageResult<StoredBankAccount> {
        let account = self.get(account_id)?;
        if account.user != owner_user_id {
            return Err(StorageError::NotFound(format!("Bank account {account_id}")));
        }
        Ok(account)
    }

    pub fn create(&self, account: &StoredBankAccount) -> StorageResult<()> {
        let path = self.path(&account.id)?;
        if self.storage.exists(&path) {
            return Err(StorageError::AlreadyExists(format!("Bank account {}", account.id)));
        }
        self.storage.write_json(path, account)
    }

    /// Apply `change` to a record of `owner_user_id` as one locked
    /// read-modify-write, so concurrent edits cannot overwrite each other.
    pub fn update_owned<F>(
        &self,
        account_id: &str,
        owner_user_id: &str,
        change: F,
    ) -> StorageResult<StoredBankAccount>
    where
        F: FnOnce(&mut StoredBankAccount),
    {
        let path = self.path(account_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Bank account {account_id}")));
        }
        self.storage.update_json(path, |account: &mut StoredBankAccount| {
            if account.user != owner_user_id {
                return Err(StorageError::NotFound(format!("Bank account {account_id}")));
            }
            change(account);
            Ok(account.clone())
        })
    }

    pub fn delete(&self, account_id: &str) -> StorageResult<()> {
        let path = self.path(account_id)?;
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Bank account {account_id}")));
        }
        self.storage.delete(path)
    }

    pub fn list_by_owner(&self, owner_user_id: &str) -> StorageResult<Vec<StoredBankAccount>> {
        let mut accounts: Vec<StoredBankAccount> = self
            .storage
            .load_all(self.storage.paths().bank_accounts_dir())?
            .into_iter()
            .filter(|account: &StoredBankAccount| account.user == owner_user_id)
            .collect();
        accounts.sort_by_key(|account| account.created_at);
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::test_support::{
        assert_no_sealed_keys, outside_record, test_cipher,
    };
    use tempfile::TempDir;

    fn request() -> CreateBankAccountRequest {
        CreateBankAccountRequest {
            account_holder: Some("Grace Hopper".to_string()),
            account_number: "000123456789".to_string(),
            ifsc: Some("HDFC0000123".to_string()),
            branch: Some("Harbour Road".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn view_decrypts_sealed_fields() {
        let cipher = test_cipher();
        let account = StoredBankAccount::new(&cipher, "user_1", &request());
        let view = account.to_view(&cipher);

        assert_eq!(view.account_holder.as_deref(), Some("Grace Hopper"));
        assert_eq!(view.account_number.as_deref(), Some("000123456789"));
        assert_eq!(view.ifsc.as_deref(), Some("HDFC0000123"));
        assert_eq!(view.branch.as_deref(), Some("Harbour Road"));
        assert_no_sealed_keys(&serde_json::to_value(&view).unwrap());
    }

    #[test]
    fn stored_form_uses_sealed_pairs() {
        let cipher = test_cipher();
        let account = StoredBankAccount::new(&cipher, "user_1", &request());
        let json = serde_json::to_value(&account).unwrap();

        assert!(json.get("encryptedAccountNumber").is_some());
        assert!(json.get("accountNumberIv").is_some());
        assert!(!json.to_string().contains("000123456789"));
    }

    #[test]
    fn corrupted_number_falls_back_to_mask() {
        let cipher = test_cipher();
        let mut account = StoredBankAccount::new(&cipher, "user_1", &request());
        account.encrypted_account_number = Some("ff".to_string());
        account.encrypted_ifsc = Some("zz".to_string());

        assert_eq!(account.account_number(&cipher).as_deref(), Some("****"));
        assert_eq!(account.ifsc(&cipher).as_deref(), Some("Encrypted"));
    }

    #[test]
    fn empty_string_update_clears_field() {
        let cipher = test_cipher();
        let mut account = StoredBankAccount::new(&cipher, "user_1", &request());

        account.apply_update(
            &cipher,
            &UpdateBankAccountRequest {
                ifsc: Some(String::new()),
                branch: Some(String::new()),
                ..Default::default()
            },
        );

        assert!(account.ifsc(&cipher).is_none());
        assert!(account.branch.is_none());
        assert_eq!(account.account_holder(&cipher).as_deref(), Some("Grace Hopper"));
    }

    #[test]
    fn repository_round_trip() {
        let temp = TempDir::new().unwrap();
        let storage = JsonStorage::open(temp.path()).unwrap();
        let cipher = test_cipher();
        let repo = BankAccountRepository::new(&storage);

        let account = StoredBankAccount::new(&cipher, "user_1", &request());
        repo.create(&account).unwrap();

        let update = UpdateBankAccountRequest {
            vpa: Some("grace@bank".to_string()),
            ..Default::default()
        };
        repo.update_owned(&account.id, "user_1", |account| {
            account.apply_update(&cipher, &update);
        })
        .unwrap();

        let loaded = repo.get_owned(&account.id, "user_1").unwrap();
        assert_eq!(loaded.vpa.as_deref(), Some("grace@bank"));
        assert!(repo.get_owned(&account.id, "user_2").is_err());
        assert!(matches!(
            repo.update_owned(&account.id, "user_2", |account| account.vpa = None),
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(
            repo.get(&account.id).unwrap().vpa.as_deref(),
            Some("grace@bank")
        );
        assert_eq!(repo.list_by_owner("user_1").unwrap().len(), 1);
    }

    #[test]
    fn ids_outside_the_data_dir_are_rejected() {
        let temp = TempDir::new().unwrap();
        let storage = JsonStorage::open(temp.path()).unwrap();
        let repo = BankAccountRepository::new(&storage);
        let (_outside, id, victim) =
            outside_record(serde_json::json!({"id": "x", "user": "user_1"}));

        assert!(matches!(repo.get_owned(&id, "user_1"), Err(StorageError::InvalidId(_))));
        assert!(matches!(
            repo.update_owned(&id, "user_1", |_| {}),
            Err(StorageError::InvalidId(_))
        ));
        assert!(matches!(repo.delete(&id), Err(StorageError::InvalidId(_))));
        assert!(victim.exists());
    }
}

//! `RocksDB` storage implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use tutor_credits_core::{CreditAccount, CreditTransaction, TransactionId, TransactionType, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
///
/// `RocksDB` write batches are atomic, but the read-check-write of a
/// deduction spans a read and a batch. The `balance_lock` serializes the
/// compound operations so two concurrent deductions for the same store can
/// never both observe the same pre-deduction balance. This store is the
/// single owner of its database directory, which is what makes a
/// process-local lock a valid storage-layer guarantee here.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    balance_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            balance_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn read_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn read_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CreditTransaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        let key = keys::transaction_key(transaction_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Write the updated account and the transaction record in one batch.
    ///
    /// The transaction's `balance_after` is stamped with the account's new
    /// balance here, inside the atomic section, so the ledger always sums
    /// to the stored balance.
    fn commit_balance_change(
        &self,
        account: &CreditAccount,
        transaction: &CreditTransaction,
    ) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_tx_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;

        let account_key = keys::account_key(&account.user_id);
        let tx_key = keys::transaction_key(&transaction.id);
        let user_tx_key = keys::user_transaction_key(&account.user_id, &transaction.id);

        let mut transaction = transaction.clone();
        transaction.balance_after = account.balance;

        let account_value = Self::serialize(account)?;
        let tx_value = Self::serialize(&transaction)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_accounts, &account_key, &account_value);
        batch.put_cf(&cf_tx, &tx_key, &tx_value);
        batch.put_cf(&cf_tx_by_user, &user_tx_key, []); // Index entry (empty value)

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

/// Add to a balance, rejecting overflow instead of wrapping.
fn checked_credit(balance: i64, amount: i64) -> Result<i64> {
    balance
        .checked_add(amount)
        .ok_or_else(|| StoreError::Database(format!("balance overflow adding {amount}")))
}

#[async_trait]
impl Store for RocksStore {
    async fn put_account(&self, account: &CreditAccount) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.user_id);
        let value = Self::serialize(account)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get_account(&self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        self.read_account(user_id)
    }

    async fn create_account(
        &self,
        account: &CreditAccount,
        starter_grant: Option<&CreditTransaction>,
    ) -> Result<CreditAccount> {
        // The lock spans the existence check, the insert, and the grant so
        // a concurrent registration cannot interleave and double-apply.
        let _guard = self
            .balance_lock
            .lock()
            .map_err(|_| StoreError::Database("balance lock poisoned".into()))?;

        if self.read_account(&account.user_id)?.is_some() {
            return Err(StoreError::AlreadyExists);
        }

        let mut account = account.clone();

        if let Some(tx) = starter_grant {
            account.balance = checked_credit(account.balance, tx.amount)?;
            account.lifetime_granted = account.lifetime_granted.saturating_add(tx.amount);
            self.commit_balance_change(&account, tx)?;
        } else {
            let cf = self.cf(cf::ACCOUNTS)?;
            let key = keys::account_key(&account.user_id);
            let value = Self::serialize(&account)?;
            self.db
                .put_cf(&cf, key, value)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        Ok(account)
    }

    async fn deduct_credits(
        &self,
        user_id: &UserId,
        amount: i64,
        transaction: &CreditTransaction,
    ) -> Result<i64> {
        let _guard = self
            .balance_lock
            .lock()
            .map_err(|_| StoreError::Database("balance lock poisoned".into()))?;

        let mut account = self.read_account(user_id)?.ok_or(StoreError::NotFound)?;

        if account.balance < amount {
            return Err(StoreError::InsufficientCredits {
                balance: account.balance,
                required: amount,
            });
        }

        account.balance -= amount;
        account.lifetime_used = account.lifetime_used.saturating_add(amount);
        account.updated_at = chrono::Utc::now();

        self.commit_balance_change(&account, transaction)?;

        Ok(account.balance)
    }

    async fn add_credits(
        &self,
        user_id: &UserId,
        amount: i64,
        transaction: &CreditTransaction,
    ) -> Result<i64> {
        let _guard = self
            .balance_lock
            .lock()
            .map_err(|_| StoreError::Database("balance lock poisoned".into()))?;

        let mut account = self.read_account(user_id)?.ok_or(StoreError::NotFound)?;

        account.balance = checked_credit(account.balance, amount)?;
        account.updated_at = chrono::Utc::now();
        if transaction.transaction_type != TransactionType::Usage {
            account.lifetime_granted = account.lifetime_granted.saturating_add(amount);
        }

        self.commit_balance_change(&account, transaction)?;

        Ok(account.balance)
    }

    async fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<CreditTransaction>> {
        self.read_transaction(transaction_id)
    }

    async fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);

        // ULID ordering within the prefix is oldest-first, so iterate in
        // reverse from the largest possible key under the prefix; the read
        // stops after limit + offset index entries instead of materializing
        // the user's whole history.
        let mut upper_bound = prefix.clone();
        upper_bound.extend_from_slice(&[0xFF; 16]);

        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&upper_bound, rocksdb::Direction::Reverse),
        );

        let mut skipped = 0;
        let mut transactions = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            if transactions.len() >= limit {
                break;
            }

            let tx_id = keys::extract_transaction_id_from_user_key(&key);
            if let Some(tx) = self.read_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tutor_credits_core::OperationKind;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn account_with_balance(user_id: UserId, balance: i64) -> CreditAccount {
        let mut account = CreditAccount::new(user_id);
        account.balance = balance;
        account
    }

    #[tokio::test]
    async fn account_roundtrip() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        store
            .put_account(&account_with_balance(user_id, 5))
            .await
            .unwrap();

        let retrieved = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(retrieved.balance, 5);

        assert!(store
            .get_account(&UserId::generate())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn create_account_applies_grant_in_one_write() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let grant = CreditTransaction::starter_grant(user_id, 20);

        let created = store
            .create_account(&CreditAccount::new(user_id), Some(&grant))
            .await
            .unwrap();
        assert_eq!(created.balance, 20);
        assert_eq!(created.lifetime_granted, 20);

        let listed = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].amount, 20);
        assert_eq!(listed[0].balance_after, 20);
    }

    #[tokio::test]
    async fn create_account_rejects_duplicate_registration() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let grant = CreditTransaction::starter_grant(user_id, 20);

        store
            .create_account(&CreditAccount::new(user_id), Some(&grant))
            .await
            .unwrap();

        let second = CreditTransaction::starter_grant(user_id, 20);
        let result = store
            .create_account(&CreditAccount::new(user_id), Some(&second))
            .await;
        assert!(matches!(result, Err(StoreError::AlreadyExists)));

        // The grant was applied exactly once.
        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.balance, 20);
        let listed = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn add_credits_rejects_overflow_without_writing() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store
            .put_account(&account_with_balance(user_id, i64::MAX - 1))
            .await
            .unwrap();

        let tx = CreditTransaction::grant(
            user_id,
            2,
            TransactionType::Purchase,
            0,
            "Purchase".into(),
            serde_json::Value::Null,
        );
        let result = store.add_credits(&user_id, 2, &tx).await;
        assert!(matches!(result, Err(StoreError::Database(_))));

        // Balance unchanged, no transaction appended.
        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.balance, i64::MAX - 1);
        let listed = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn deduct_updates_balance_and_records_transaction() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store
            .put_account(&account_with_balance(user_id, 5))
            .await
            .unwrap();

        let tx = CreditTransaction::usage(user_id, OperationKind::Ocr, 1, 4, "OCR".into());
        let balance = store.deduct_credits(&user_id, 1, &tx).await.unwrap();
        assert_eq!(balance, 4);

        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.balance, 4);
        assert_eq!(account.lifetime_used, 1);

        let listed = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].amount, -1);
    }

    #[tokio::test]
    async fn deduct_insufficient_writes_nothing() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store
            .put_account(&account_with_balance(user_id, 1))
            .await
            .unwrap();

        let tx = CreditTransaction::usage(user_id, OperationKind::SolveMath, 2, 0, "Solve".into());
        let result = store.deduct_credits(&user_id, 2, &tx).await;
        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                balance: 1,
                required: 2
            })
        ));

        // Balance unchanged, no transaction appended.
        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.balance, 1);
        let listed = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn deduct_missing_account_is_not_found() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let tx = CreditTransaction::usage(user_id, OperationKind::Chat, 1, 0, "Chat".into());

        let result = store.deduct_credits(&user_id, 1, &tx).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn add_credits_updates_lifetime_granted() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store.put_account(&CreditAccount::new(user_id)).await.unwrap();

        let tx = CreditTransaction::grant(
            user_id,
            10,
            TransactionType::Purchase,
            10,
            "Purchase".into(),
            serde_json::Value::Null,
        );
        let balance = store.add_credits(&user_id, 10, &tx).await.unwrap();
        assert_eq!(balance, 10);

        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.lifetime_granted, 10);
    }

    #[tokio::test]
    async fn list_is_newest_first_with_pagination() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store.put_account(&CreditAccount::new(user_id)).await.unwrap();

        // ULIDs are generated at creation time; space them out so ordering
        // is deterministic.
        let tx1 = CreditTransaction::grant(
            user_id,
            5,
            TransactionType::Bonus,
            5,
            "Grant 1".into(),
            serde_json::Value::Null,
        );
        store.add_credits(&user_id, 5, &tx1).await.unwrap();

        std::thread::sleep(std::time::Duration::from_millis(2));

        let tx2 = CreditTransaction::grant(
            user_id,
            3,
            TransactionType::Bonus,
            8,
            "Grant 2".into(),
            serde_json::Value::Null,
        );
        store.add_credits(&user_id, 3, &tx2).await.unwrap();

        let all = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].description, "Grant 2");
        assert_eq!(all[1].description, "Grant 1");

        let page1 = store
            .list_transactions_by_user(&user_id, 1, 0)
            .await
            .unwrap();
        let page2 = store
            .list_transactions_by_user(&user_id, 1, 1)
            .await
            .unwrap();
        assert_eq!(page1[0].description, "Grant 2");
        assert_eq!(page2[0].description, "Grant 1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_deductions_allow_exactly_one_success() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let user_id = UserId::generate();
        store
            .put_account(&account_with_balance(user_id, 1))
            .await
            .unwrap();

        let mk_tx =
            || CreditTransaction::usage(user_id, OperationKind::Chat, 1, 0, "Chat".into());

        let a = {
            let store = Arc::clone(&store);
            let tx = mk_tx();
            tokio::spawn(async move { store.deduct_credits(&user_id, 1, &tx).await })
        };
        let b = {
            let store = Arc::clone(&store);
            let tx = mk_tx();
            tokio::spawn(async move { store.deduct_credits(&user_id, 1, &tx).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one deduction must win");

        let loser = results.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            loser,
            Err(StoreError::InsufficientCredits {
                balance: 0,
                required: 1
            })
        ));

        // Exactly one usage transaction; balance driven to zero, not below.
        let account = store.get_account(&user_id).await.unwrap().unwrap();
        assert_eq!(account.balance, 0);
        let listed = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn conservation_sum_of_amounts_equals_balance() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store.put_account(&CreditAccount::new(user_id)).await.unwrap();

        let grant = CreditTransaction::grant(
            user_id,
            5,
            TransactionType::Purchase,
            5,
            "Purchase".into(),
            serde_json::Value::Null,
        );
        store.add_credits(&user_id, 5, &grant).await.unwrap();

        std::thread::sleep(std::time::Duration::from_millis(2));
        let usage = CreditTransaction::usage(user_id, OperationKind::SolveMath, 2, 3, "Solve".into());
        store.deduct_credits(&user_id, 2, &usage).await.unwrap();

        let account = store.get_account(&user_id).await.unwrap().unwrap();
        let listed = store
            .list_transactions_by_user(&user_id, 10, 0)
            .await
            .unwrap();
        let sum: i64 = listed.iter().map(|tx| tx.amount).sum();
        assert_eq!(sum, account.balance);
    }
}

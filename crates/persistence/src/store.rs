//! Ledger store - the persistence contract the session talks to.
//!
//! Every operation returns a `PersistenceResult`; faults are logged here and
//! handed back as `Err`, never as a panic. Single writes run in autocommit
//! mode, transfers run both balance updates inside one transaction.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::{self, CardRepo, CardRow};
use cardbank_core::{derive_id, Account};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use tracing::{debug, error, info};

/// SQLite-backed ledger of card accounts
pub struct LedgerStore {
    pool: SqlitePool,
}

impl LedgerStore {
    /// Open (or create) the database file and make sure the table exists
    pub async fn open(db_path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let db_path = db_path.as_ref();
        let pool = sqlite::connect(db_path).await.inspect_err(|err| {
            error!(path = %db_path.display(), error = %err, "failed to open ledger database");
        })?;

        let store = Self::from_pool(pool);
        store.init().await?;
        Ok(store)
    }

    /// Wrap an existing pool. The table is not created; call [`init`](Self::init).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the `card` table if missing
    pub async fn init(&self) -> PersistenceResult<()> {
        logged("init", sqlite::create_schema(&self.pool).await)
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Release the connection. Called once at process exit.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// True iff a row exists under the id embedded in `card_number`.
    ///
    /// Lookup is by id only; anything that is not 16 digits has no id and
    /// so does not exist.
    pub async fn exists(&self, card_number: &str) -> PersistenceResult<bool> {
        let Some(id) = derive_id(card_number) else {
            return Ok(false);
        };
        let found = logged("exists", CardRepo::contains_id(&self.pool, id.into()).await)?;
        debug!(account_id = %id, found, "checked card id");
        Ok(found)
    }

    /// Insert a new account. Fails if its id is already taken.
    pub async fn insert(&self, account: &Account) -> PersistenceResult<()> {
        if self.exists(account.card_number().as_str()).await? {
            let err = PersistenceError::already_exists("Card", &account.id().to_string());
            return logged("insert", Err(err));
        }

        logged(
            "insert",
            CardRepo::insert(&self.pool, &CardRow::from(account)).await,
        )?;
        info!(account_id = %account.id(), "card inserted");
        Ok(())
    }

    /// Load the account with exactly this card number.
    ///
    /// Rows are fetched by the derived id and then scanned for an exact
    /// number match. With a fixed prefix and a deterministic check digit the
    /// id alone already identifies the card, so the scan never discards a
    /// row today; it only matters if the numbering scheme changes.
    pub async fn find_by_card_number(&self, card_number: &str) -> PersistenceResult<Option<Account>> {
        let Some(id) = derive_id(card_number) else {
            debug!("lookup with malformed card number");
            return Ok(None);
        };

        let rows = logged("find", CardRepo::get_by_id(&self.pool, id.into()).await)?;
        match rows.into_iter().find(|row| row.number == card_number) {
            Some(row) => logged("find", Account::try_from(row)).map(Some),
            None => {
                debug!(account_id = %id, "no card with that exact number");
                Ok(None)
            }
        }
    }

    /// Full-row update by id: number, PIN and balance as currently held in memory
    pub async fn update_balance(&self, account: &Account) -> PersistenceResult<()> {
        logged(
            "update",
            CardRepo::update(&self.pool, &CardRow::from(account)).await,
        )?;
        info!(account_id = %account.id(), balance = account.balance(), "balance updated");
        Ok(())
    }

    /// Update if the id exists, insert otherwise
    pub async fn put(&self, account: &Account) -> PersistenceResult<()> {
        if self.exists(account.card_number().as_str()).await? {
            self.update_balance(account).await
        } else {
            self.insert(account).await
        }
    }

    /// Remove the row for this account
    pub async fn delete(&self, account: &Account) -> PersistenceResult<()> {
        logged("delete", CardRepo::delete(&self.pool, account.id().into()).await)?;
        info!(account_id = %account.id(), "card deleted");
        Ok(())
    }

    /// Number of stored accounts
    pub async fn count(&self) -> PersistenceResult<i64> {
        logged("count", CardRepo::count(&self.pool).await)
    }

    /// Move `amount` from `source` to `destination` atomically.
    ///
    /// Works on copies: on success the updated `(source, destination)` pair is
    /// returned and both rows are committed; on any failure the transaction is
    /// rolled back and the caller's accounts are untouched.
    pub async fn transfer_atomic(
        &self,
        source: &Account,
        destination: &Account,
        amount: i64,
    ) -> PersistenceResult<(Account, Account)> {
        let mut source = source.clone();
        let mut destination = destination.clone();
        logged("transfer", source.debit(amount).map_err(PersistenceError::from))?;
        logged("transfer", destination.credit(amount).map_err(PersistenceError::from))?;

        let mut tx = logged("transfer", self.pool.begin().await.map_err(PersistenceError::from))?;

        match write_transfer(&mut tx, &source, &destination).await {
            Ok(()) => {
                logged("transfer", tx.commit().await.map_err(PersistenceError::from))?;
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "transfer rollback failed");
                }
                return logged("transfer", Err(err));
            }
        }

        info!(
            from = %source.id(),
            to = %destination.id(),
            amount,
            "transfer committed"
        );
        Ok((source, destination))
    }
}

async fn write_transfer(
    tx: &mut Transaction<'_, Sqlite>,
    source: &Account,
    destination: &Account,
) -> PersistenceResult<()> {
    CardRepo::update_balance(&mut **tx, source.id().into(), source.balance()).await?;
    CardRepo::update_balance(&mut **tx, destination.id().into(), destination.balance()).await?;
    Ok(())
}

fn logged<T>(operation: &str, result: PersistenceResult<T>) -> PersistenceResult<T> {
    if let Err(err) = &result {
        error!(operation, error = %err, "ledger store operation failed");
    }
    result
}

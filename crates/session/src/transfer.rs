//! Transfer validation pipeline.
//!
//! Checks run in a fixed order and stop at the first failure:
//! same account, check digit, destination exists, sufficient funds.
//! The amount is only asked for once the destination has passed.

use cardbank_core::{validate, Account};
use cardbank_persistence::{LedgerStore, PersistenceError};
use thiserror::Error;
use tracing::debug;

/// A transfer refused before touching storage. `Display` is the user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransferRejection {
    #[error("You can't transfer money to the same account!")]
    SameAccount,

    #[error("Probably you made a mistake in the card number. Please try again!")]
    InvalidCardNumber,

    #[error("Such a card does not exist.")]
    UnknownCard,

    #[error("Not enough money!")]
    InsufficientFunds,
}

/// Why a transfer did not happen
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Rejected(#[from] TransferRejection),

    /// Storage fault; already logged by the store
    #[error(transparent)]
    Storage(#[from] PersistenceError),
}

/// Steps 1 and 2: no storage access needed.
pub fn check_destination_format(source: &Account, destination: &str) -> Result<(), TransferRejection> {
    if destination == source.card_number().as_str() {
        return Err(TransferRejection::SameAccount);
    }
    if !validate(destination) {
        return Err(TransferRejection::InvalidCardNumber);
    }
    Ok(())
}

/// Step 4. Only an amount above the balance is refused.
pub fn check_funds(source: &Account, amount: i64) -> Result<(), TransferRejection> {
    if amount > source.balance() {
        return Err(TransferRejection::InsufficientFunds);
    }
    Ok(())
}

/// Runs the transfer checks against a store and commits the result
pub struct TransferPipeline<'a> {
    store: &'a LedgerStore,
}

impl<'a> TransferPipeline<'a> {
    pub fn new(store: &'a LedgerStore) -> Self {
        Self { store }
    }

    /// Steps 1 to 3: resolve the destination account or say why not.
    pub async fn destination(&self, source: &Account, destination: &str) -> Result<Account, TransferError> {
        check_destination_format(source, destination).inspect_err(|rejection| {
            debug!(from = %source.id(), %rejection, "transfer rejected");
        })?;

        match self.store.find_by_card_number(destination).await? {
            Some(account) => Ok(account),
            None => {
                debug!(from = %source.id(), "transfer to unknown card");
                Err(TransferRejection::UnknownCard.into())
            }
        }
    }

    /// Steps 4 and 5: check funds, then commit both balances in one transaction.
    ///
    /// Returns the updated `(source, destination)` pair.
    pub async fn execute(
        &self,
        source: &Account,
        destination: &Account,
        amount: i64,
    ) -> Result<(Account, Account), TransferError> {
        check_funds(source, amount).inspect_err(|rejection| {
            debug!(from = %source.id(), amount, %rejection, "transfer rejected");
        })?;

        let updated = self.store.transfer_atomic(source, destination, amount).await?;
        Ok(updated)
    }
}

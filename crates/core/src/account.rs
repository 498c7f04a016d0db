//! # Account Module
//!
//! Định nghĩa Account - một thẻ trong ledger.
//! Identity (id, card number, PIN) không đổi sau khi tạo; chỉ balance thay đổi,
//! và chỉ qua `credit` / `debit`.

use crate::card::{AccountId, CardNumber};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tài khoản thẻ.
///
/// Mutations are local only. The caller persists the new balance and drops
/// the mutated copy if persisting fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    card_number: CardNumber,
    pin: String,
    balance: i64,
}

impl Account {
    /// Account mới với balance 0
    pub fn new(id: AccountId, pin: impl Into<String>) -> Self {
        Self {
            id,
            card_number: CardNumber::for_id(id),
            pin: pin.into(),
            balance: 0,
        }
    }

    /// Dựng lại account từ dữ liệu đã lưu
    pub fn restore(id: AccountId, card_number: CardNumber, pin: impl Into<String>, balance: i64) -> Self {
        Self {
            id,
            card_number,
            pin: pin.into(),
            balance,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn card_number(&self) -> &CardNumber {
        &self.card_number
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn pin_matches(&self, candidate: &str) -> bool {
        self.pin == candidate
    }

    /// balance += amount. Any amount is accepted, negative included.
    pub fn credit(&mut self, amount: i64) -> CoreResult<i64> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(CoreError::BalanceOverflow {
                balance: self.balance,
                amount,
            })?;
        Ok(self.balance)
    }

    /// balance -= amount. Sufficiency is checked by the transfer pipeline, not here.
    pub fn debit(&mut self, amount: i64) -> CoreResult<i64> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(CoreError::BalanceOverflow {
                balance: self.balance,
                amount: amount.saturating_neg(),
            })?;
        Ok(self.balance)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Account {} (card: {}, balance: {})",
            self.id, self.card_number, self.balance
        )
    }
}

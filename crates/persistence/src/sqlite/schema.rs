//! Database schema definitions
//!
//! Row type cho sqlx mapping từ bảng `card`.

use cardbank_core::{Account, AccountId, CardNumber};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// DDL của bảng duy nhất
pub const CREATE_CARD_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS card (
        id INTEGER PRIMARY KEY,
        number TEXT,
        pin TEXT,
        balance INTEGER DEFAULT 0
    )
"#;

/// Row type cho bảng `card`
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct CardRow {
    pub id: i64,
    pub number: String,
    pub pin: String,
    pub balance: i64,
}

// === Conversion implementations ===

impl From<&Account> for CardRow {
    fn from(account: &Account) -> Self {
        Self {
            id: i64::from(account.id()),
            number: account.card_number().as_str().to_string(),
            pin: account.pin().to_string(),
            balance: account.balance(),
        }
    }
}

impl TryFrom<CardRow> for Account {
    type Error = PersistenceError;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        let id = AccountId::try_from(row.id)?;
        let card_number = CardNumber::parse(&row.number)?;
        if card_number.account_id() != id {
            return Err(PersistenceError::InvalidRow(format!(
                "card {} stored under id {}",
                row.number, row.id
            )));
        }
        Ok(Account::restore(id, card_number, row.pin, row.balance))
    }
}

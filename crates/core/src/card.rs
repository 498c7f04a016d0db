//! # Card Module
//!
//! Card number = issuer prefix `400000` + account id (9 chữ số, zero-padded)
//! + 1 Luhn check digit. Tổng cộng 16 chữ số ASCII.
//!
//! # Examples
//! ```
//! use cardbank_core::{AccountId, CardNumber};
//!
//! let id = AccountId::new(844_943_340).unwrap();
//! let card = CardNumber::for_id(id);
//! assert_eq!(card.as_str(), "4000008449433403");
//! assert!(cardbank_core::validate(card.as_str()));
//! ```

use crate::account::Account;
use crate::error::{CoreError, CoreResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issuer identification number, fixed cho mọi thẻ
pub const ISSUER_PREFIX: &str = "400000";

/// Độ dài card number đầy đủ
pub const CARD_NUMBER_LEN: usize = 16;

/// Số chữ số trước check digit
const PAYLOAD_LEN: usize = 15;

/// PIN luôn là 4 chữ số
pub const PIN_LEN: usize = 4;

const PIN_UPPER_BOUND: u16 = 10_000;

/// 9-digit account id, nằm trong card number ở vị trí 7..15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct AccountId(u32);

impl AccountId {
    /// Giới hạn trên (exclusive) của id
    pub const UPPER_BOUND: u32 = 1_000_000_000;

    pub fn new(value: u32) -> CoreResult<Self> {
        if value >= Self::UPPER_BOUND {
            return Err(CoreError::InvalidAccountId(i64::from(value)));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for AccountId {
    type Error = CoreError;

    fn try_from(value: u32) -> CoreResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<i64> for AccountId {
    type Error = CoreError;

    fn try_from(value: i64) -> CoreResult<Self> {
        let raw = u32::try_from(value).map_err(|_| CoreError::InvalidAccountId(value))?;
        Self::new(raw)
    }
}

impl From<AccountId> for u32 {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl From<AccountId> for i64 {
    fn from(id: AccountId) -> Self {
        i64::from(id.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:09}", self.0)
    }
}

/// A 16-digit card number whose last digit is the Luhn check digit of the
/// first fifteen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl CardNumber {
    /// Build the card number for an account id under the fixed issuer prefix.
    pub fn for_id(id: AccountId) -> Self {
        let mut number = format!("{}{}", ISSUER_PREFIX, id);
        let digit = luhn_check_digit(number.as_bytes());
        number.push(char::from(b'0' + digit));
        Self(number)
    }

    /// Parse user or storage input, rejecting anything that is not 16 ASCII
    /// digits with a matching check digit.
    pub fn parse(input: &str) -> CoreResult<Self> {
        if input.len() != CARD_NUMBER_LEN || !is_ascii_digits(input) {
            return Err(CoreError::InvalidCardNumber(input.to_string()));
        }

        let bytes = input.as_bytes();
        let expected = luhn_check_digit(&bytes[..PAYLOAD_LEN]);
        if bytes[PAYLOAD_LEN] - b'0' != expected {
            return Err(CoreError::CheckDigitMismatch {
                number: input.to_string(),
                expected,
            });
        }

        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The account id embedded in this card number.
    pub fn account_id(&self) -> AccountId {
        // parse() and for_id() both guarantee 9 digits at 6..15
        AccountId(digits_value(&self.0.as_bytes()[ISSUER_PREFIX.len()..PAYLOAD_LEN]))
    }
}

impl TryFrom<String> for CardNumber {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::parse(&value)
    }
}

impl From<CardNumber> for String {
    fn from(card: CardNumber) -> Self {
        card.0
    }
}

impl AsRef<str> for CardNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Luhn check digit cho 15 chữ số đầu.
///
/// Các vị trí chẵn (0-indexed) được nhân đôi, trừ 9 nếu lớn hơn 9.
/// Check digit = `(10 - sum % 10) % 10`.
pub fn check_digit(first_fifteen: &str) -> CoreResult<u8> {
    if first_fifteen.len() != PAYLOAD_LEN || !is_ascii_digits(first_fifteen) {
        return Err(CoreError::InvalidCardNumber(first_fifteen.to_string()));
    }
    Ok(luhn_check_digit(first_fifteen.as_bytes()))
}

/// True iff `card_number` is exactly 16 ASCII digits and its last digit is
/// the Luhn check digit of the first 15.
pub fn validate(card_number: &str) -> bool {
    CardNumber::parse(card_number).is_ok()
}

/// Account id embedded in any 16-digit string (check digit not verified).
///
/// Lookups in the store go through this key, so a number with a wrong check
/// digit still maps to an id; the exact-match scan rejects it afterwards.
pub fn derive_id(card_number: &str) -> Option<AccountId> {
    if card_number.len() != CARD_NUMBER_LEN || !is_ascii_digits(card_number) {
        return None;
    }
    let raw = digits_value(&card_number.as_bytes()[ISSUER_PREFIX.len()..PAYLOAD_LEN]);
    Some(AccountId(raw))
}

fn luhn_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .take(PAYLOAD_LEN)
        .enumerate()
        .map(|(i, b)| {
            let mut digit = u32::from(b - b'0');
            if i % 2 == 0 {
                digit *= 2;
                if digit > 9 {
                    digit -= 9;
                }
            }
            digit
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

fn is_ascii_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn digits_value(digits: &[u8]) -> u32 {
    digits
        .iter()
        .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'))
}

/// Random source cho account id và PIN.
///
/// The generator is injected by the caller and seeded there, so a fixed seed
/// gives a reproducible sequence of cards.
pub struct CardIssuer<R> {
    rng: R,
}

impl<R: Rng> CardIssuer<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Uniform id in `[0, 1_000_000_000)`. Uniqueness is the caller's job.
    pub fn generate_id(&mut self) -> AccountId {
        AccountId(self.rng.gen_range(0..AccountId::UPPER_BOUND))
    }

    /// Uniform PIN in `[0, 10000)`, zero-padded to 4 digits.
    pub fn generate_pin(&mut self) -> String {
        format!("{:0width$}", self.rng.gen_range(0..PIN_UPPER_BOUND), width = PIN_LEN)
    }

    /// Draw an id then a PIN and build a fresh zero-balance account.
    pub fn issue(&mut self) -> Account {
        let id = self.generate_id();
        let pin = self.generate_pin();
        Account::new(id, pin)
    }
}

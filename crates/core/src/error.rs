//! # Error Module
//!
//! Domain errors cho Cardbank sử dụng thiserror.

use thiserror::Error;

/// Core domain errors.
///
/// Các lỗi nghiệp vụ cốt lõi, không liên quan đến infrastructure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    // === Card errors ===
    #[error("Invalid card number: {0}")]
    InvalidCardNumber(String),

    #[error("Check digit mismatch for {number}: expected {expected}")]
    CheckDigitMismatch { number: String, expected: u8 },

    // === Account errors ===
    #[error("Account id out of range: {0}")]
    InvalidAccountId(i64),

    #[error("Balance overflow: balance {balance}, amount {amount}")]
    BalanceOverflow { balance: i64, amount: i64 },
}

/// Result type alias với CoreError
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidCardNumber("12ab".to_string());
        assert_eq!(err.to_string(), "Invalid card number: 12ab");

        let err = CoreError::BalanceOverflow {
            balance: i64::MAX,
            amount: 1,
        };
        assert!(err.to_string().contains("amount 1"));
    }
}

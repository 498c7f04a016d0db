//! # Cardbank Core
//!
//! Core domain types cho Cardbank:
//! - [`card`]: card number layout, Luhn check digit, random issuing
//! - [`account`]: the `Account` entity and its two balance mutations
//! - [`error`]: domain errors

pub mod account;
pub mod card;
pub mod error;

pub use account::Account;
pub use card::{derive_id, validate, AccountId, CardIssuer, CardNumber, ISSUER_PREFIX};
pub use error::{CoreError, CoreResult};

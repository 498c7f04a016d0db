//! # Cardbank Session
//!
//! Interactive protocol on top of the ledger store: account creation, login,
//! balance, income, transfers, account closure.

pub mod error;
pub mod menu;
pub mod session;
pub mod transfer;

pub use error::{SessionError, SessionResult};
pub use menu::{AccountMenu, MainMenu};
pub use session::{Session, SessionState};
pub use transfer::{TransferError, TransferPipeline, TransferRejection};

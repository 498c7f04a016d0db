//! # Cardbank Persistence
//!
//! Persistence layer cho Cardbank - một bảng SQLite `card`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 LedgerStore                  │
//! │  ┌──────────────┐        ┌────────────────┐  │
//! │  │   CardRepo   │ ─────▶ │  SQLite `card` │  │
//! │  │  (queries)   │        │   (state)      │  │
//! │  └──────────────┘        └────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cardbank_persistence::LedgerStore;
//!
//! let store = LedgerStore::open("card.db").await?;
//! if let Some(account) = store.find_by_card_number("4000008449433403").await? {
//!     println!("{}", account.balance());
//! }
//! store.close().await;
//! ```

pub mod error;
pub mod sqlite;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use sqlite::{CardRepo, CardRow};
pub use store::LedgerStore;

//! Numbered menus for the two session states

use crate::error::{SessionError, SessionResult};
use std::str::FromStr;

/// Top-level menu, shown while logged out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainMenu {
    CreateAccount,
    LogIn,
    Exit,
}

impl MainMenu {
    pub const LINES: [&'static str; 3] = ["1. Create an account", "2. Log into account", "0. Exit"];
}

impl FromStr for MainMenu {
    type Err = SessionError;

    fn from_str(input: &str) -> SessionResult<Self> {
        match input.trim() {
            "1" => Ok(Self::CreateAccount),
            "2" => Ok(Self::LogIn),
            "0" => Ok(Self::Exit),
            other => Err(SessionError::invalid_choice(other)),
        }
    }
}

/// In-session menu, shown while logged in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountMenu {
    Balance,
    AddIncome,
    Transfer,
    CloseAccount,
    LogOut,
    Exit,
}

impl AccountMenu {
    pub const LINES: [&'static str; 6] = [
        "1. Balance",
        "2. Add income",
        "3. Do transfer",
        "4. Close account",
        "5. Log out",
        "0. Exit",
    ];
}

impl FromStr for AccountMenu {
    type Err = SessionError;

    fn from_str(input: &str) -> SessionResult<Self> {
        match input.trim() {
            "1" => Ok(Self::Balance),
            "2" => Ok(Self::AddIncome),
            "3" => Ok(Self::Transfer),
            "4" => Ok(Self::CloseAccount),
            "5" => Ok(Self::LogOut),
            "0" => Ok(Self::Exit),
            other => Err(SessionError::invalid_choice(other)),
        }
    }
}

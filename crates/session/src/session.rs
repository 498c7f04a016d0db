//! Interactive session state machine.
//!
//! ```text
//! LoggedOut ──login──▶ LoggedIn ──logout / close──▶ LoggedOut
//!     │                   │
//!     └──────exit─────────┴──────▶ Exited
//! ```
//!
//! Input is read line by line from any `BufRead`, output goes to any `Write`,
//! so tests drive the whole protocol with in-memory buffers.

use crate::error::{SessionError, SessionResult};
use crate::menu::{AccountMenu, MainMenu};
use crate::transfer::{TransferError, TransferPipeline};
use cardbank_core::{Account, CardIssuer};
use cardbank_persistence::LedgerStore;
use rand::Rng;
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Where the session currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    /// The session owns its working copy of the account
    LoggedIn(Account),
    Exited,
}

/// One interactive run over a store
pub struct Session<'a, I, O, R> {
    store: &'a LedgerStore,
    issuer: CardIssuer<R>,
    input: I,
    output: O,
}

impl<'a, I, O, R> Session<'a, I, O, R>
where
    I: BufRead,
    O: Write,
    R: Rng,
{
    pub fn new(store: &'a LedgerStore, issuer: CardIssuer<R>, input: I, output: O) -> Self {
        Self {
            store,
            issuer,
            input,
            output,
        }
    }

    /// Drive the menus until the user exits or the input ends.
    pub async fn run(&mut self) -> SessionResult<()> {
        let mut state = SessionState::LoggedOut;

        while state != SessionState::Exited {
            state = match self.step(state).await {
                Ok(next) => next,
                Err(err) if err.is_input_closed() => {
                    debug!("input closed, leaving");
                    self.say("Bye!")?;
                    SessionState::Exited
                }
                Err(err) => return Err(err),
            };
        }

        self.output.flush()?;
        Ok(())
    }

    /// Show the menu for `state`, handle one choice and return the next state.
    pub async fn step(&mut self, state: SessionState) -> SessionResult<SessionState> {
        let next = match state {
            SessionState::LoggedOut => self.main_menu().await?,
            SessionState::LoggedIn(account) => self.account_menu(account).await?,
            SessionState::Exited => return Ok(SessionState::Exited),
        };

        if next == SessionState::Exited {
            self.say("Bye!")?;
        } else {
            self.blank()?;
        }
        Ok(next)
    }

    async fn main_menu(&mut self) -> SessionResult<SessionState> {
        let choice = loop {
            self.say_lines(&MainMenu::LINES)?;
            let line = self.read_line()?;
            self.blank()?;
            match line.parse::<MainMenu>() {
                Ok(choice) => break choice,
                Err(err) => debug!(error = %err, "re-prompting main menu"),
            }
        };

        match choice {
            MainMenu::CreateAccount => {
                self.create_account().await?;
                Ok(SessionState::LoggedOut)
            }
            MainMenu::LogIn => self.log_in().await,
            MainMenu::Exit => Ok(SessionState::Exited),
        }
    }

    async fn account_menu(&mut self, account: Account) -> SessionResult<SessionState> {
        let choice = loop {
            self.say_lines(&AccountMenu::LINES)?;
            let line = self.read_line()?;
            self.blank()?;
            if let Ok(choice) = line.parse::<AccountMenu>() {
                break choice;
            }
        };

        match choice {
            AccountMenu::Balance => {
                self.say(&format!("Balance: {}", account.balance()))?;
                Ok(SessionState::LoggedIn(account))
            }
            AccountMenu::AddIncome => self.add_income(account).await,
            AccountMenu::Transfer => self.transfer(account).await,
            AccountMenu::CloseAccount => self.close_account(account).await,
            AccountMenu::LogOut => {
                info!(account_id = %account.id(), "logged out");
                self.say("You have successfully logged out!")?;
                Ok(SessionState::LoggedOut)
            }
            AccountMenu::Exit => Ok(SessionState::Exited),
        }
    }

    /// Draw cards until one has a free id, store it, and show number and PIN once.
    async fn create_account(&mut self) -> SessionResult<()> {
        let created = match self.issue_unique().await {
            Ok(account) => self.store.insert(&account).await.map(|()| account),
            Err(err) => Err(err),
        };

        match created {
            Ok(account) => {
                info!(account_id = %account.id(), "account created");
                self.say("Your card has been created")?;
                self.say("Your card number:")?;
                self.say(account.card_number().as_str())?;
                self.say("Your card PIN:")?;
                self.say(account.pin())?;
            }
            Err(_) => self.say("The card could not be created.")?,
        }
        Ok(())
    }

    async fn issue_unique(&mut self) -> Result<Account, cardbank_persistence::PersistenceError> {
        loop {
            let candidate = self.issuer.issue();
            if !self.store.exists(candidate.card_number().as_str()).await? {
                return Ok(candidate);
            }
            debug!(account_id = %candidate.id(), "id already taken, drawing again");
        }
    }

    /// Unknown card and wrong PIN get the same answer.
    async fn log_in(&mut self) -> SessionResult<SessionState> {
        self.say("Enter your card number:")?;
        let card_number = self.read_line()?;
        self.say("Enter your PIN:")?;
        let pin = self.read_line()?;
        self.blank()?;

        let found = self.store.find_by_card_number(&card_number).await.unwrap_or(None);
        match found {
            Some(account) if account.pin_matches(&pin) => {
                info!(account_id = %account.id(), "logged in");
                self.say("You have successfully logged in!")?;
                Ok(SessionState::LoggedIn(account))
            }
            _ => {
                debug!("failed login attempt");
                self.say("Wrong card number or PIN!")?;
                Ok(SessionState::LoggedOut)
            }
        }
    }

    /// Credit a copy, persist it, keep the copy only if the write succeeded.
    async fn add_income(&mut self, account: Account) -> SessionResult<SessionState> {
        let amount = self.read_amount("Enter income:")?;

        let mut updated = account.clone();
        if let Err(err) = updated.credit(amount) {
            info!(account_id = %account.id(), error = %err, "income rejected");
            self.say("Income was not added!")?;
            return Ok(SessionState::LoggedIn(account));
        }

        match self.store.update_balance(&updated).await {
            Ok(()) => {
                self.say("Income was added!")?;
                Ok(SessionState::LoggedIn(updated))
            }
            Err(_) => {
                self.say("Income was not added!")?;
                Ok(SessionState::LoggedIn(account))
            }
        }
    }

    async fn transfer(&mut self, account: Account) -> SessionResult<SessionState> {
        let pipeline = TransferPipeline::new(self.store);

        self.say("Enter card number:")?;
        let target = self.read_line()?;
        let destination = match pipeline.destination(&account, &target).await {
            Ok(destination) => destination,
            Err(err) => {
                self.report_transfer_failure(&err)?;
                return Ok(SessionState::LoggedIn(account));
            }
        };

        let amount = self.read_amount("Enter how much money you want to transfer:")?;
        match pipeline.execute(&account, &destination, amount).await {
            Ok((source, _)) => {
                self.say("Success!")?;
                Ok(SessionState::LoggedIn(source))
            }
            Err(err) => {
                self.report_transfer_failure(&err)?;
                Ok(SessionState::LoggedIn(account))
            }
        }
    }

    fn report_transfer_failure(&mut self, err: &TransferError) -> SessionResult<()> {
        match err {
            TransferError::Rejected(rejection) => self.say(&rejection.to_string()),
            // the store has already logged the fault
            TransferError::Storage(_) => Ok(()),
        }
    }

    /// No zero-balance check. A closed account ends the session.
    async fn close_account(&mut self, account: Account) -> SessionResult<SessionState> {
        match self.store.delete(&account).await {
            Ok(()) => {
                info!(account_id = %account.id(), "account closed");
                self.say("The account has been closed!")?;
                Ok(SessionState::LoggedOut)
            }
            Err(_) => {
                self.say("The account could not be closed.")?;
                Ok(SessionState::LoggedIn(account))
            }
        }
    }

    /// Ask until the answer parses as a signed integer.
    fn read_amount(&mut self, prompt: &str) -> SessionResult<i64> {
        loop {
            self.say(prompt)?;
            let line = self.read_line()?;
            match line.parse::<i64>() {
                Ok(amount) => return Ok(amount),
                Err(err) => debug!(input = %line, error = %err, "not an integer amount"),
            }
        }
    }

    /// Bytes that are not UTF-8 are replaced, so they fail parsing like any other typo.
    fn read_line(&mut self) -> SessionResult<String> {
        self.output.flush()?;
        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw)? == 0 {
            return Err(SessionError::InputClosed);
        }
        Ok(String::from_utf8_lossy(&raw).trim().to_string())
    }

    fn say(&mut self, text: &str) -> SessionResult<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    fn say_lines(&mut self, lines: &[&str]) -> SessionResult<()> {
        for line in lines {
            self.say(line)?;
        }
        Ok(())
    }

    fn blank(&mut self) -> SessionResult<()> {
        writeln!(self.output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use cardbank_core::AccountId;
    use std::io::Cursor;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, LedgerStore) {
        let dir = TempDir::new().unwrap();
        let store = LedgerStore::open(dir.path().join("card.db")).await.unwrap();
        (dir, store)
    }

    async fn run_script(store: &LedgerStore, seed: u64, script: &str) -> String {
        let mut output = Vec::new();
        {
            let issuer = CardIssuer::new(StdRng::seed_from_u64(seed));
            let mut session = Session::new(store, issuer, Cursor::new(script.to_string()), &mut output);
            session.run().await.unwrap();
        }
        String::from_utf8(output).unwrap()
    }

    async fn created_account(store: &LedgerStore, seed: u64) -> (String, String, AccountId) {
        let out = run_script(store, seed, "1\n0\n").await;
        let (number, pin) = created_card(&out);
        let id = cardbank_core::derive_id(&number).unwrap();
        (number, pin, id)
    }

    /// Make every `op` ("UPDATE" or "DELETE") on one card row abort.
    async fn fail_writes_for(store: &LedgerStore, id: AccountId, op: &str) {
        let sql = format!(
            "CREATE TRIGGER fail_{op} BEFORE {op} ON card WHEN OLD.id = {} \
             BEGIN SELECT RAISE(ABORT, 'injected fault'); END",
            id.value()
        );
        sqlx::query(&sql).execute(store.pool()).await.unwrap();
    }

    async fn stored_balance(store: &LedgerStore, number: &str) -> i64 {
        store.find_by_card_number(number).await.unwrap().unwrap().balance()
    }

    fn created_card(output: &str) -> (String, String) {
        let lines: Vec<&str> = output.lines().collect();
        let number_at = lines.iter().position(|l| *l == "Your card number:").unwrap();
        let pin_at = lines.iter().position(|l| *l == "Your card PIN:").unwrap();
        (lines[number_at + 1].to_string(), lines[pin_at + 1].to_string())
    }

    #[tokio::test]
    async fn test_exit_immediately() {
        let (_dir, store) = open_store().await;
        let out = run_script(&store, 0, "0\n").await;
        assert_eq!(out, "1. Create an account\n2. Log into account\n0. Exit\n\nBye!\n");
    }

    #[tokio::test]
    async fn test_eof_exits() {
        let (_dir, store) = open_store().await;
        let out = run_script(&store, 0, "").await;
        assert!(out.ends_with("Bye!\n"));
    }

    #[tokio::test]
    async fn test_invalid_main_menu_input_reprompts() {
        let (_dir, store) = open_store().await;
        let out = run_script(&store, 0, "abc\n9\n0\n").await;
        assert_eq!(out.matches("1. Create an account").count(), 3);
        assert!(out.ends_with("Bye!\n"));
    }

    #[tokio::test]
    async fn test_create_account_prints_card_once() {
        let (_dir, store) = open_store().await;
        let out = run_script(&store, 3, "1\n0\n").await;

        let (number, pin) = created_card(&out);
        assert!(cardbank_core::validate(&number));
        assert_eq!(pin.len(), 4);
        assert!(store.exists(&number).await.unwrap());
        assert_eq!(out.matches(&number).count(), 1);
    }

    #[tokio::test]
    async fn test_creation_retries_on_id_collision() {
        let (_dir, store) = open_store().await;

        // same seed twice: the second run draws the first run's id first
        let first = run_script(&store, 11, "1\n0\n").await;
        let second = run_script(&store, 11, "1\n0\n").await;

        let (first_number, _) = created_card(&first);
        let (second_number, _) = created_card(&second);
        assert_ne!(first_number, second_number);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_wrong_pin_and_unknown_card_look_the_same() {
        let (_dir, store) = open_store().await;
        let created = run_script(&store, 5, "1\n0\n").await;
        let (number, pin) = created_card(&created);
        let wrong_pin = if pin == "0000" { "1111" } else { "0000" };

        let out = run_script(&store, 5, &format!("2\n{number}\n{wrong_pin}\n0\n")).await;
        assert!(out.contains("Wrong card number or PIN!"));

        let out = run_script(&store, 5, &format!("2\n4000008449433403\n{pin}\n0\n")).await;
        assert!(out.contains("Wrong card number or PIN!"));

        let out = run_script(&store, 5, "2\nnot-a-card\n1234\n0\n").await;
        assert!(out.contains("Wrong card number or PIN!"));
    }

    #[tokio::test]
    async fn test_session_menu_ignores_bad_choice() {
        let (_dir, store) = open_store().await;
        let created = run_script(&store, 8, "1\n0\n").await;
        let (number, pin) = created_card(&created);

        let out = run_script(&store, 8, &format!("2\n{number}\n{pin}\n7\nx\n1\n5\n0\n")).await;
        assert_eq!(out.matches("1. Balance").count(), 4);
        assert!(out.contains("Balance: 0"));
        assert!(out.contains("You have successfully logged out!"));
        assert!(out.ends_with("Bye!\n"));
    }

    #[tokio::test]
    async fn test_deposit_reprompts_on_bad_amount() {
        let (_dir, store) = open_store().await;
        let created = run_script(&store, 9, "1\n0\n").await;
        let (number, pin) = created_card(&created);

        let out = run_script(
            &store,
            9,
            &format!("2\n{number}\n{pin}\n2\nten\n-30\n2\n80\n1\n0\n"),
        )
        .await;
        assert_eq!(out.matches("Enter income:").count(), 3);
        assert_eq!(out.matches("Income was added!").count(), 2);
        assert!(out.contains("Balance: 50"));

        let stored = store.find_by_card_number(&number).await.unwrap().unwrap();
        assert_eq!(stored.balance(), 50);
    }

    #[tokio::test]
    async fn test_transfer_messages() {
        let (_dir, store) = open_store().await;
        let a = run_script(&store, 21, "1\n0\n").await;
        let b = run_script(&store, 22, "1\n0\n").await;
        let (a_number, a_pin) = created_card(&a);
        let (b_number, _) = created_card(&b);

        let mut typo = b_number.clone();
        let last = typo.pop().unwrap();
        typo.push(if last == '0' { '1' } else { '0' });

        let script = format!(
            "2\n{a_number}\n{a_pin}\n\
             2\n100\n\
             3\n{a_number}\n\
             3\n{typo}\n\
             3\n4000008449433403\n\
             3\n{b_number}\n150\n\
             3\n{b_number}\n40\n\
             1\n0\n"
        );
        let out = run_script(&store, 21, &script).await;

        assert!(out.contains("You can't transfer money to the same account!"));
        assert!(out.contains("Probably you made a mistake in the card number. Please try again!"));
        assert!(out.contains("Such a card does not exist."));
        assert!(out.contains("Not enough money!"));
        assert!(out.contains("Success!"));
        assert!(out.contains("Balance: 60"));

        let stored_b = store.find_by_card_number(&b_number).await.unwrap().unwrap();
        assert_eq!(stored_b.balance(), 40);
    }

    #[tokio::test]
    async fn test_close_account_ends_session() {
        let (_dir, store) = open_store().await;
        let created = run_script(&store, 30, "1\n0\n").await;
        let (number, pin) = created_card(&created);

        let out = run_script(&store, 30, &format!("2\n{number}\n{pin}\n4\n0\n")).await;
        assert!(out.contains("The account has been closed!"));
        // back at the top-level menu after closing
        let tail = out.rsplit("The account has been closed!").next().unwrap();
        assert!(tail.contains("1. Create an account"));
        assert!(!store.exists(&number).await.unwrap());
    }

    #[tokio::test]
    async fn test_non_utf8_input_reprompts() {
        let (_dir, store) = open_store().await;
        let mut output = Vec::new();
        {
            let issuer = CardIssuer::new(StdRng::seed_from_u64(0));
            let input = Cursor::new(b"\xff\xfe\n0\n".to_vec());
            let mut session = Session::new(&store, issuer, input, &mut output);
            session.run().await.unwrap();
        }
        let out = String::from_utf8(output).unwrap();
        assert_eq!(out.matches("1. Create an account").count(), 2);
        assert!(out.ends_with("Bye!\n"));
    }

    #[tokio::test]
    async fn test_failed_deposit_keeps_old_balance() {
        let (_dir, store) = open_store().await;
        let (number, pin, id) = created_account(&store, 40).await;
        fail_writes_for(&store, id, "UPDATE").await;

        let out = run_script(&store, 40, &format!("2\n{number}\n{pin}\n2\n75\n1\n0\n")).await;
        assert!(out.contains("Income was not added!"));
        assert!(!out.contains("Income was added!"));
        assert!(out.contains("Balance: 0"));
        assert_eq!(stored_balance(&store, &number).await, 0);
    }

    #[tokio::test]
    async fn test_failed_deposit_step_returns_unchanged_account() {
        let (_dir, store) = open_store().await;
        let (number, _, id) = created_account(&store, 41).await;
        fail_writes_for(&store, id, "UPDATE").await;
        let account = store.find_by_card_number(&number).await.unwrap().unwrap();

        let mut output = Vec::new();
        let issuer = CardIssuer::new(StdRng::seed_from_u64(41));
        let mut session = Session::new(&store, issuer, Cursor::new("2\n75\n"), &mut output);
        let next = session.step(SessionState::LoggedIn(account.clone())).await.unwrap();

        assert_eq!(next, SessionState::LoggedIn(account));
    }

    #[tokio::test]
    async fn test_failed_transfer_write_changes_nothing() {
        let (_dir, store) = open_store().await;
        let (a_number, a_pin, _) = created_account(&store, 42).await;
        let (b_number, _, b_id) = created_account(&store, 43).await;

        run_script(&store, 42, &format!("2\n{a_number}\n{a_pin}\n2\n100\n0\n")).await;
        fail_writes_for(&store, b_id, "UPDATE").await;

        let script = format!("2\n{a_number}\n{a_pin}\n3\n{b_number}\n40\n1\n0\n");
        let out = run_script(&store, 42, &script).await;

        assert!(!out.contains("Success!"));
        assert!(out.contains("Balance: 100"));
        assert_eq!(stored_balance(&store, &a_number).await, 100);
        assert_eq!(stored_balance(&store, &b_number).await, 0);
    }

    #[tokio::test]
    async fn test_failed_close_stays_logged_in() {
        let (_dir, store) = open_store().await;
        let (number, pin, id) = created_account(&store, 44).await;
        fail_writes_for(&store, id, "DELETE").await;

        let out = run_script(&store, 44, &format!("2\n{number}\n{pin}\n4\n1\n0\n")).await;
        assert!(out.contains("The account could not be closed."));
        assert!(!out.contains("The account has been closed!"));
        // still in the account menu after the failure
        let tail = out.rsplit("The account could not be closed.").next().unwrap();
        assert!(tail.contains("1. Balance"));
        assert!(tail.contains("Balance: 0"));
        assert!(store.exists(&number).await.unwrap());
    }
}

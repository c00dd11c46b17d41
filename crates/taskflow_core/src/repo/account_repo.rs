//! Account directory: registration, login and session token persistence.
//!
//! # Responsibility
//! - Maintain the `accounts` collection with unique emails.
//! - Issue, persist and resolve the single active session token.
//!
//! # Invariants
//! - No two stored accounts share an email (case-sensitive comparison).
//! - The `session` collection holds at most one token.
//! - `current_account` resolves by the token's bound account id.
//! - Passwords are handed to the `CredentialVerifier` and never stored here.

use crate::error::ErrorKind;
use crate::model::account::{Account, AccountId, SessionToken};
use crate::store::{read_records, write_records, Collection, RecordStore, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Account directory failures.
#[derive(Debug)]
pub enum DirectoryError {
    DuplicateAccount(String),
    InvalidCredentials,
    Store(StoreError),
}

impl DirectoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateAccount(_) => ErrorKind::DuplicateAccount,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::Store(_) => ErrorKind::Storage,
        }
    }
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateAccount(email) => write!(f, "account already exists: {email}"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for DirectoryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Credential check seam. Swap in real hashing without touching the
/// directory contract.
pub trait CredentialVerifier {
    /// Records `password` for a newly registered account.
    fn enroll(&self, account: &Account, password: &str) -> DirectoryResult<()>;
    /// Returns whether `password` is acceptable for `account`.
    fn verify(&self, account: &Account, password: &str) -> DirectoryResult<bool>;
}

/// Placeholder verifier: stores nothing and accepts every password.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAnyCredential;

impl CredentialVerifier for AcceptAnyCredential {
    fn enroll(&self, _account: &Account, _password: &str) -> DirectoryResult<()> {
        Ok(())
    }

    fn verify(&self, _account: &Account, _password: &str) -> DirectoryResult<bool> {
        Ok(true)
    }
}

/// Account directory over an injected record store.
pub struct AccountDirectory<S: RecordStore> {
    store: S,
    verifier: Box<dyn CredentialVerifier>,
}

impl<S: RecordStore> AccountDirectory<S> {
    /// Creates a directory using [`AcceptAnyCredential`].
    pub fn new(store: S) -> Self {
        Self::with_verifier(store, Box::new(AcceptAnyCredential))
    }

    pub fn with_verifier(store: S, verifier: Box<dyn CredentialVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Registers a new account and signs it in.
    ///
    /// The token is written before the account, so a failed write never
    /// leaves a stored account behind; a token whose account is missing
    /// resolves to no session.
    ///
    /// # Errors
    /// - `DuplicateAccount` when the email is taken; nothing is written.
    /// - `Store` when either write fails; the email stays available.
    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> DirectoryResult<(Account, SessionToken)> {
        let mut accounts = self.accounts()?;
        if accounts.iter().any(|account| account.email == email) {
            warn!("event=account_register module=directory status=error error_code=duplicate_account");
            return Err(DirectoryError::DuplicateAccount(email.to_string()));
        }

        let account = Account::new(name, email);
        self.verifier.enroll(&account, password)?;
        let token = self.issue_token(account.id)?;
        accounts.push(account.clone());
        write_records(&self.store, Collection::Accounts, &accounts)?;

        info!(
            "event=account_register module=directory status=ok account_id={} accounts={}",
            account.id,
            accounts.len()
        );
        Ok((account, token))
    }

    /// Signs in the account registered under `email`.
    ///
    /// # Errors
    /// - `InvalidCredentials` when no account matches or the verifier
    ///   rejects the password.
    pub fn login(&self, email: &str, password: &str) -> DirectoryResult<(Account, SessionToken)> {
        let account = self
            .accounts()?
            .into_iter()
            .find(|account| account.email == email)
            .ok_or(DirectoryError::InvalidCredentials)?;

        if !self.verifier.verify(&account, password)? {
            warn!(
                "event=account_login module=directory status=error account_id={} error_code=invalid_credentials",
                account.id
            );
            return Err(DirectoryError::InvalidCredentials);
        }

        let token = self.issue_token(account.id)?;
        info!(
            "event=account_login module=directory status=ok account_id={}",
            account.id
        );
        Ok((account, token))
    }

    /// Discards the persisted token. Succeeds when none exists.
    pub fn logout(&self) -> DirectoryResult<()> {
        write_records::<SessionToken, _>(&self.store, Collection::Session, &[])?;
        info!("event=account_logout module=directory status=ok");
        Ok(())
    }

    /// Returns the persisted session token, if any.
    pub fn current_token(&self) -> DirectoryResult<Option<SessionToken>> {
        let tokens: Vec<SessionToken> = read_records(&self.store, Collection::Session)?;
        Ok(tokens.into_iter().next())
    }

    /// Resolves the signed-in account from the token's bound id.
    ///
    /// Returns `None` without a token, or when the bound account is gone.
    pub fn current_account(&self) -> DirectoryResult<Option<Account>> {
        let Some(token) = self.current_token()? else {
            return Ok(None);
        };
        self.find_account(token.account_id)
    }

    /// Looks up one account by id.
    pub fn find_account(&self, id: AccountId) -> DirectoryResult<Option<Account>> {
        Ok(self.accounts()?.into_iter().find(|account| account.id == id))
    }

    /// All registered accounts in registration order.
    pub fn accounts(&self) -> DirectoryResult<Vec<Account>> {
        Ok(read_records(&self.store, Collection::Accounts)?)
    }

    fn issue_token(&self, account_id: AccountId) -> DirectoryResult<SessionToken> {
        let token = SessionToken::issue(account_id);
        write_records(&self.store, Collection::Session, std::slice::from_ref(&token))?;
        Ok(token)
    }
}

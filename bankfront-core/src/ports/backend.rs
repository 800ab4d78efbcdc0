//! Bank backend port
//!
//! Defines the interface to the bank's backend services (user service,
//! ledger writer, balance reader, transaction history, contacts). The
//! frontend services depend only on this trait.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{Contact, FormState, HistoryEntry, Session, TransactionRequest};

/// Backend services abstraction
///
/// Errors follow one convention: a backend that answered with a 4xx/5xx
/// yields `Error::Rejected` carrying the response text; anything that never
/// got an answer yields `Error::Backend`.
#[async_trait]
pub trait BankBackend: Send + Sync {
    // === Users ===

    /// Exchange credentials for a signed session token
    async fn login(&self, username: &str, password: &str) -> Result<String>;

    /// Create a user from the submitted signup form
    async fn create_user(&self, form: &FormState) -> Result<()>;

    // === Ledger ===

    /// Submit a transfer to the ledger writer
    async fn submit_transaction(&self, session: &Session, tx: &TransactionRequest) -> Result<()>;

    /// Current balance in cents
    async fn get_balance(&self, session: &Session, account_id: &str) -> Result<i64>;

    /// Recent transactions, newest first
    async fn get_transactions(&self, session: &Session, account_id: &str) -> Result<Vec<HistoryEntry>>;

    // === Contacts ===

    async fn get_contacts(&self, session: &Session, username: &str) -> Result<Vec<Contact>>;

    async fn add_contact(&self, session: &Session, username: &str, contact: &Contact) -> Result<()>;
}

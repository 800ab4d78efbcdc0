//! Core domain entities
//!
//! Forms, tokens, accounts and money. These are pure data structures with
//! validation logic; no I/O.

mod account;
pub mod constraint;
pub mod form;
pub mod modal;
pub mod money;
pub mod page;
pub mod result;
mod session;
mod token;
pub mod transaction;

pub use account::{AccountNumber, Contact, ContactLabel, ExternalAccount, RoutingNumber};
pub use constraint::{FieldKind, FieldRule, Violation};
pub use form::{FieldError, FieldSpec, FormController, FormKind, FormSchema, FormState, SubmitDecision};
pub use modal::{AccountSelection, HomeModals, ModalController, ModalKind, ModalMode, ModalView};
pub use page::{LoginPage, SignupPage};
pub use session::{Claims, Session};
pub use token::IdempotencyToken;
pub use transaction::{HistoryEntry, TransactionRequest};

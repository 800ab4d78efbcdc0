//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! covers one page or form of the frontend.

pub mod auth;
mod deposit;
pub mod event_log;
mod home;
mod payment;
mod submission;
mod validation;

pub use auth::{decode_unverified, AuthService, TokenVerifier};
pub use deposit::DepositService;
pub use event_log::{EntryPoint, Event, EventEntry, EventLogService};
pub use home::{HistoryRow, HomeService, HomeView, SelectOption};
pub use payment::PaymentService;
pub use submission::SubmissionOutcome;
pub use validation::ValidationService;

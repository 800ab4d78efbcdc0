//! How a payment or deposit ended, as shown in the home page banner

use serde::{Deserialize, Serialize};

use crate::domain::result::Result;
use crate::domain::FormKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum SubmissionOutcome {
    Succeeded,
    /// Refused with a reason the user may see
    Rejected(String),
    /// Failed for a reason that stays in the logs
    Failed,
}

impl SubmissionOutcome {
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => SubmissionOutcome::Succeeded,
            Err(e) => match e.user_reason() {
                Some(reason) => SubmissionOutcome::Rejected(reason.to_string()),
                None => SubmissionOutcome::Failed,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Succeeded)
    }

    /// Banner text, e.g. `Payment failed: insufficient balance`
    pub fn message(&self, kind: FormKind) -> String {
        let title = match kind {
            FormKind::Login => "Login",
            FormKind::Signup => "Signup",
            FormKind::Payment => "Payment",
            FormKind::Deposit => "Deposit",
        };
        match self {
            SubmissionOutcome::Succeeded => format!("{} successful", title),
            SubmissionOutcome::Rejected(reason) => format!("{} failed: {}", title, reason),
            SubmissionOutcome::Failed => format!("{} failed", title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::Error;

    #[test]
    fn test_messages() {
        let ok: Result<()> = Ok(());
        assert_eq!(
            SubmissionOutcome::from_result(&ok).message(FormKind::Payment),
            "Payment successful"
        );

        let rejected: Result<()> = Err(Error::rejected("insufficient balance"));
        assert_eq!(
            SubmissionOutcome::from_result(&rejected).message(FormKind::Deposit),
            "Deposit failed: insufficient balance"
        );

        let transport: Result<()> = Err(Error::backend("connection refused"));
        assert_eq!(
            SubmissionOutcome::from_result(&transport).message(FormKind::Payment),
            "Payment failed"
        );
    }
}

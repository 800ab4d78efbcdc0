//! Server-side run of the client form validator
//!
//! The same schemas and controller that drive the browser forms are run
//! against every posted form before any backend call, so a request that
//! skipped the page gets the same verdict.

use chrono::NaiveDate;

use crate::domain::form::{DEPOSIT_ACCOUNT, PAYMENT_ACCOUNT};
use crate::domain::modal::NEW_OPTION;
use crate::domain::result::{Error, Result};
use crate::domain::{FormController, FormKind, FormSchema, FormState, SubmitDecision};

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationService;

impl ValidationService {
    pub fn new() -> Self {
        Self
    }

    /// Schema for `kind` as the page would render it for this form state
    pub fn schema_for(&self, kind: FormKind, form: &FormState, today: NaiveDate) -> FormSchema {
        match kind {
            FormKind::Login => FormSchema::login(),
            FormKind::Signup => FormSchema::signup(today),
            FormKind::Payment => FormSchema::payment(form.get(PAYMENT_ACCOUNT) == NEW_OPTION),
            FormKind::Deposit => FormSchema::deposit(form.get(DEPOSIT_ACCOUNT) == NEW_OPTION),
        }
    }

    /// Run one submit through a fresh controller
    pub fn validate(&self, kind: FormKind, form: &FormState, today: NaiveDate) -> SubmitDecision {
        let mut controller = FormController::new(kind, self.schema_for(kind, form, today));
        controller.submit(form)
    }

    /// Like `validate`, but a blocked submission becomes a validation error
    pub fn check(&self, kind: FormKind, form: &FormState, today: NaiveDate) -> Result<()> {
        let decision = self.validate(kind, form, today);
        if decision.proceed {
            return Ok(());
        }
        Err(Error::validation(
            decision
                .reason()
                .unwrap_or_else(|| format!("invalid {} form", kind.as_str())),
        ))
    }
}

//! Payment and deposit modal controllers
//!
//! Each modal has a selector offering existing accounts plus an "add new"
//! option. The selector drives a two-state machine:
//!
//! - `Existing`: extra sub-fields hidden and not required
//! - `New`: extra sub-fields visible and required
//!
//! Every refresh (construction, selector change, cancel) recomputes that
//! state, mints a fresh idempotency token and hides inline feedback.

use serde::{Deserialize, Serialize};

use super::account::{AccountNumber, ExternalAccount};
use super::form::{
    FormController, FormKind, FormSchema, FormState, SubmitDecision, CONTACT_ACCOUNT_NUM,
    CONTACT_LABEL, DEPOSIT_ACCOUNT, EXTERNAL_ACCOUNT_NUM, EXTERNAL_LABEL, EXTERNAL_ROUTING_NUM,
    PAYMENT_ACCOUNT, UUID,
};
use super::result::Result;
use super::token::IdempotencyToken;

/// Selector value of the "add new account/contact" option
pub const NEW_OPTION: &str = "add";

/// A typed selector value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelection<T> {
    Existing(T),
    New,
}

impl<T> AccountSelection<T> {
    pub fn is_new(&self) -> bool {
        matches!(self, AccountSelection::New)
    }
}

impl AccountSelection<AccountNumber> {
    /// Payment selector: a contact's account number or `add`
    pub fn parse_payment(value: &str) -> Result<Self> {
        if value == NEW_OPTION {
            return Ok(AccountSelection::New);
        }
        AccountNumber::parse(value).map(AccountSelection::Existing)
    }
}

impl AccountSelection<ExternalAccount> {
    /// Deposit selector: an external account as JSON, or `add`
    pub fn parse_deposit(value: &str) -> Result<Self> {
        if value == NEW_OPTION {
            return Ok(AccountSelection::New);
        }
        ExternalAccount::from_selector_value(value).map(AccountSelection::Existing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalMode {
    Existing,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalKind {
    Payment,
    Deposit,
}

impl ModalKind {
    pub fn form_kind(&self) -> FormKind {
        match self {
            ModalKind::Payment => FormKind::Payment,
            ModalKind::Deposit => FormKind::Deposit,
        }
    }

    /// Field holding the account selection
    pub fn selector_field(&self) -> &'static str {
        match self {
            ModalKind::Payment => PAYMENT_ACCOUNT,
            ModalKind::Deposit => DEPOSIT_ACCOUNT,
        }
    }

    /// Sub-fields shown only for a new account
    pub fn extra_fields(&self) -> &'static [&'static str] {
        match self {
            ModalKind::Payment => &[CONTACT_ACCOUNT_NUM, CONTACT_LABEL],
            ModalKind::Deposit => &[EXTERNAL_ACCOUNT_NUM, EXTERNAL_ROUTING_NUM, EXTERNAL_LABEL],
        }
    }

    /// Sub-fields that become required for a new account
    pub fn required_when_new(&self) -> &'static [&'static str] {
        match self {
            ModalKind::Payment => &[CONTACT_ACCOUNT_NUM],
            ModalKind::Deposit => &[EXTERNAL_ACCOUNT_NUM, EXTERNAL_ROUTING_NUM],
        }
    }

    fn schema(&self, new_account: bool) -> FormSchema {
        match self {
            ModalKind::Payment => FormSchema::payment(new_account),
            ModalKind::Deposit => FormSchema::deposit(new_account),
        }
    }
}

/// Snapshot of a modal for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalView {
    pub kind: ModalKind,
    pub mode: ModalMode,
    pub extra_fields_visible: bool,
    pub required_fields: Vec<String>,
    pub uuid: IdempotencyToken,
    pub was_validated: bool,
}

/// Controller for one payment or deposit modal
#[derive(Debug, Clone)]
pub struct ModalController {
    kind: ModalKind,
    /// Selector value the form resets to
    default_selection: String,
    form: FormState,
    controller: FormController,
    mode: ModalMode,
    token: IdempotencyToken,
}

impl ModalController {
    /// Create a modal whose selector starts at `initial_selection`
    /// (the first option rendered, or `add` when there are no accounts)
    pub fn new(kind: ModalKind, initial_selection: impl Into<String>) -> Self {
        let default_selection = initial_selection.into();
        let mut form = FormState::new();
        form.set(kind.selector_field(), default_selection.clone());
        let mut modal = Self {
            kind,
            default_selection,
            form,
            controller: FormController::new(kind.form_kind(), kind.schema(false)),
            mode: ModalMode::Existing,
            token: IdempotencyToken::generate(),
        };
        modal.refresh();
        modal
    }

    pub fn kind(&self) -> ModalKind {
        self.kind
    }

    pub fn mode(&self) -> ModalMode {
        self.mode
    }

    pub fn token(&self) -> IdempotencyToken {
        self.token
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn was_validated(&self) -> bool {
        self.controller.was_validated()
    }

    pub fn extra_fields_visible(&self) -> bool {
        self.mode == ModalMode::New
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.controller.schema().is_required(field)
    }

    /// User input into a regular field. Selector changes go through `select`.
    pub fn set_field(&mut self, field: &str, value: impl Into<String>) {
        if field == self.kind.selector_field() {
            self.select(value);
        } else {
            self.form.set(field, value);
        }
    }

    /// Change event on the selector
    pub fn select(&mut self, value: impl Into<String>) {
        self.form.set(self.kind.selector_field(), value);
        self.refresh();
    }

    /// Cancel button: reset the form, selector included, and refresh
    pub fn cancel(&mut self) {
        self.form.reset();
        self.form.set(self.kind.selector_field(), self.default_selection.clone());
        self.refresh();
    }

    /// Bring visibility, required-ness and the token back in sync
    pub fn refresh(&mut self) {
        let new_account = self.form.get(self.kind.selector_field()) == NEW_OPTION;
        self.mode = if new_account {
            ModalMode::New
        } else {
            ModalMode::Existing
        };

        let schema = self.controller.schema_mut();
        for field in self.kind.required_when_new() {
            schema.set_required(field, new_account);
        }

        self.token = IdempotencyToken::regenerate(&self.token);
        self.form.set(UUID, self.token.to_string());
        self.controller.clear_validated();
    }

    /// Submit event
    pub fn submit(&mut self) -> SubmitDecision {
        self.controller.submit(&self.form)
    }

    pub fn view(&self) -> ModalView {
        ModalView {
            kind: self.kind,
            mode: self.mode,
            extra_fields_visible: self.extra_fields_visible(),
            required_fields: self
                .controller
                .schema()
                .fields
                .iter()
                .filter(|f| f.rule.required)
                .map(|f| f.name.clone())
                .collect(),
            uuid: self.token,
            was_validated: self.was_validated(),
        }
    }
}

/// Both modals of the home page
#[derive(Debug, Clone)]
pub struct HomeModals {
    pub payment: ModalController,
    pub deposit: ModalController,
}

impl HomeModals {
    /// Page load: both modals start refreshed with their own tokens
    pub fn new(payment_selection: impl Into<String>, deposit_selection: impl Into<String>) -> Self {
        Self {
            payment: ModalController::new(ModalKind::Payment, payment_selection),
            deposit: ModalController::new(ModalKind::Deposit, deposit_selection),
        }
    }

    pub fn get_mut(&mut self, kind: ModalKind) -> &mut ModalController {
        match kind {
            ModalKind::Payment => &mut self.payment,
            ModalKind::Deposit => &mut self.deposit,
        }
    }

    pub fn refresh_all(&mut self) {
        self.payment.refresh();
        self.deposit.refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::form::AMOUNT;

    const CONTACT: &str = "1033623433";

    #[test]
    fn test_initial_state_existing() {
        let modal = ModalController::new(ModalKind::Payment, CONTACT);
        assert_eq!(modal.mode(), ModalMode::Existing);
        assert!(!modal.extra_fields_visible());
        assert!(!modal.is_required(CONTACT_ACCOUNT_NUM));
        assert!(!modal.was_validated());
        assert_eq!(modal.form().get(UUID), modal.token().to_string());
    }

    #[test]
    fn test_select_new_makes_fields_required_and_visible() {
        let mut modal = ModalController::new(ModalKind::Deposit, "add");
        assert_eq!(modal.mode(), ModalMode::New);
        assert!(modal.extra_fields_visible());
        assert!(modal.is_required(EXTERNAL_ACCOUNT_NUM));
        assert!(modal.is_required(EXTERNAL_ROUTING_NUM));
        assert!(!modal.is_required(EXTERNAL_LABEL));

        let existing = ExternalAccount::from_selector_value(
            r#"{"account_num": "9099791699", "routing_num": "808889588"}"#,
        )
        .unwrap();
        modal.select(existing.to_selector_value());
        assert_eq!(modal.mode(), ModalMode::Existing);
        assert!(!modal.extra_fields_visible());
        assert!(!modal.is_required(EXTERNAL_ACCOUNT_NUM));
        assert!(!modal.is_required(EXTERNAL_ROUTING_NUM));
    }

    #[test]
    fn test_every_refresh_mints_new_token() {
        let mut modal = ModalController::new(ModalKind::Payment, CONTACT);
        let first = modal.token();
        modal.select("add");
        let second = modal.token();
        modal.cancel();
        let third = modal.token();

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(IdempotencyToken::parse(&third.to_string()).unwrap(), third);
        assert_eq!(modal.form().get(UUID), third.to_string());
    }

    #[test]
    fn test_refresh_clears_validated_flag() {
        let mut modal = ModalController::new(ModalKind::Payment, CONTACT);
        modal.set_field(AMOUNT, "0");
        assert!(!modal.submit().proceed);
        assert!(modal.was_validated());

        modal.select("add");
        assert!(!modal.was_validated());
    }

    #[test]
    fn test_cancel_resets_fields_and_selection() {
        let mut modal = ModalController::new(ModalKind::Payment, CONTACT);
        modal.select("add");
        modal.set_field(CONTACT_ACCOUNT_NUM, "1234567890");
        modal.set_field(AMOUNT, "3");
        assert_eq!(modal.mode(), ModalMode::New);
        modal.cancel();

        assert_eq!(modal.form().get(AMOUNT), "");
        assert_eq!(modal.form().get(CONTACT_ACCOUNT_NUM), "");
        assert_eq!(modal.form().get(PAYMENT_ACCOUNT), CONTACT);
        assert_eq!(modal.mode(), ModalMode::Existing);
        assert!(!modal.extra_fields_visible());
        assert!(!modal.is_required(CONTACT_ACCOUNT_NUM));
    }

    #[test]
    fn test_cancel_without_accounts_stays_new() {
        let mut modal = ModalController::new(ModalKind::Deposit, "add");
        modal.set_field(EXTERNAL_ACCOUNT_NUM, "1234567890");
        modal.cancel();

        assert_eq!(modal.form().get(EXTERNAL_ACCOUNT_NUM), "");
        assert_eq!(modal.mode(), ModalMode::New);
    }

    #[test]
    fn test_amount_rules() {
        for amount in ["0", "-5", "0.00"] {
            let mut modal = ModalController::new(ModalKind::Payment, CONTACT);
            modal.set_field(AMOUNT, amount);
            let decision = modal.submit();
            assert!(!decision.proceed, "amount {} should be blocked", amount);
            assert!(decision.error_for(AMOUNT).is_some());
        }

        let mut modal = ModalController::new(ModalKind::Payment, CONTACT);
        modal.set_field(AMOUNT, "12.50");
        assert!(modal.submit().proceed);
    }

    #[test]
    fn test_new_contact_requires_account_number() {
        let mut modal = ModalController::new(ModalKind::Payment, "add");
        modal.set_field(AMOUNT, "10");
        let decision = modal.submit();
        assert!(!decision.proceed);
        assert!(decision.error_for(CONTACT_ACCOUNT_NUM).is_some());

        modal.set_field(CONTACT_ACCOUNT_NUM, "1234567890");
        assert!(modal.submit().proceed);
    }

    #[test]
    fn test_home_modals_have_independent_tokens() {
        let mut modals = HomeModals::new(CONTACT, "add");
        assert_ne!(modals.payment.token(), modals.deposit.token());

        let deposit_before = modals.deposit.token();
        modals.get_mut(ModalKind::Payment).select("add");
        assert_eq!(modals.deposit.token(), deposit_before);

        modals.refresh_all();
        assert_ne!(modals.deposit.token(), deposit_before);
    }

    #[test]
    fn test_selection_parsing() {
        assert!(AccountSelection::parse_payment("add").unwrap().is_new());
        assert_eq!(
            AccountSelection::parse_payment(CONTACT).unwrap(),
            AccountSelection::Existing(AccountNumber::parse(CONTACT).unwrap())
        );
        assert!(AccountSelection::parse_payment("12").is_err());
        assert!(AccountSelection::parse_deposit("add").unwrap().is_new());
        assert!(AccountSelection::parse_deposit("{}").is_err());
    }
}

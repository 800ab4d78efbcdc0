//! Form state, schemas and the submit-time form controller
//!
//! A `FormController` owns everything a form needs between page load and
//! submission: the field schema, the "validated" flag that makes inline
//! feedback visible and, for signup, the page-level alert banner.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::constraint::{check_value, FieldKind, FieldRule, Violation, DATE_FORMAT};
use super::money::is_positive_amount;

// Field names shared with the HTML forms and the server-side handlers
pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";
pub const PASSWORD_REPEAT: &str = "password-repeat";
pub const FIRSTNAME: &str = "firstname";
pub const LASTNAME: &str = "lastname";
pub const BIRTHDAY: &str = "birthday";
pub const TIMEZONE: &str = "timezone";
pub const ADDRESS: &str = "address";
pub const STATE: &str = "state";
pub const ZIP: &str = "zip";
pub const SSN: &str = "ssn";
pub const AMOUNT: &str = "amount";
pub const UUID: &str = "uuid";
pub const PAYMENT_ACCOUNT: &str = "account_num";
pub const CONTACT_ACCOUNT_NUM: &str = "contact_account_num";
pub const CONTACT_LABEL: &str = "contact_label";
pub const DEPOSIT_ACCOUNT: &str = "account";
pub const EXTERNAL_ACCOUNT_NUM: &str = "external_account_num";
pub const EXTERNAL_ROUTING_NUM: &str = "external_routing_num";
pub const EXTERNAL_LABEL: &str = "external_label";

pub const USERNAME_PATTERN: &str = "[a-zA-Z0-9_]{2,15}";
pub const ACCOUNT_NUM_PATTERN: &str = "[0-9]{10}";
pub const ROUTING_NUM_PATTERN: &str = "[0-9]{9}";
pub const LABEL_PATTERN: &str = "[0-9a-zA-Z][0-9a-zA-Z ]{0,29}";

/// The forms the frontend serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Login,
    Signup,
    Payment,
    Deposit,
}

impl FormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Login => "login",
            FormKind::Signup => "signup",
            FormKind::Payment => "payment",
            FormKind::Deposit => "deposit",
        }
    }

    /// Endpoint the form posts to
    pub fn action(&self) -> &'static str {
        match self {
            FormKind::Login => "/login",
            FormKind::Signup => "/signup",
            FormKind::Payment => "/payment",
            FormKind::Deposit => "/deposit",
        }
    }

    /// Field that must hold an amount greater than zero, if any
    pub fn amount_field(&self) -> Option<&'static str> {
        match self {
            FormKind::Payment | FormKind::Deposit => Some(AMOUNT),
            _ => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "login" => Some(FormKind::Login),
            "signup" => Some(FormKind::Signup),
            "payment" => Some(FormKind::Payment),
            "deposit" => Some(FormKind::Deposit),
            _ => None,
        }
    }
}

/// Raw string values of one form, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormState {
    values: BTreeMap<String, String>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a field; missing fields read as empty, like an untouched input
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    /// Value of a field, distinguishing "absent" from "empty"
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Clear every value, as a form reset does
    pub fn reset(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormState {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One field of a form schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub rule: FieldRule,
    /// Inline "invalid-feedback" text shown once the form is validated
    pub feedback: String,
}

impl FieldSpec {
    pub fn new(
        name: impl Into<String>,
        kind: FieldKind,
        rule: FieldRule,
        feedback: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            rule,
            feedback: feedback.into(),
        }
    }
}

/// A failed field, with the message the form displays for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub violation: Violation,
    pub message: String,
}

/// Mapping of field -> validation rule for one form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    pub fields: Vec<FieldSpec>,
}

impl FormSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.rule.required)
    }

    pub fn set_required(&mut self, name: &str, required: bool) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.rule.required = required;
        }
    }

    /// Run constraint validation over every field
    pub fn check(&self, form: &FormState) -> Vec<FieldError> {
        self.fields
            .iter()
            .filter_map(|field| {
                check_value(field.kind, &field.rule, form.get(&field.name)).map(|violation| {
                    FieldError {
                        field: field.name.clone(),
                        violation,
                        message: field.feedback.clone(),
                    }
                })
            })
            .collect()
    }

    pub fn login() -> Self {
        Self::new(vec![
            FieldSpec::new(
                USERNAME,
                FieldKind::Text,
                FieldRule::new().required(),
                "Please enter your username.",
            ),
            FieldSpec::new(
                PASSWORD,
                FieldKind::Password,
                FieldRule::new().required(),
                "Please enter your password.",
            ),
        ])
    }

    /// Signup form; `today` caps the birthday field
    pub fn signup(today: NaiveDate) -> Self {
        let required = || FieldRule::new().required();
        Self::new(vec![
            FieldSpec::new(
                USERNAME,
                FieldKind::Text,
                required().pattern(USERNAME_PATTERN),
                "Username must be 2-15 characters: letters, digits or underscores.",
            ),
            FieldSpec::new(PASSWORD, FieldKind::Password, required(), "Please enter a password."),
            FieldSpec::new(
                PASSWORD_REPEAT,
                FieldKind::Password,
                required(),
                "Please repeat your password.",
            ),
            FieldSpec::new(FIRSTNAME, FieldKind::Text, required(), "Please enter your first name."),
            FieldSpec::new(LASTNAME, FieldKind::Text, required(), "Please enter your last name."),
            FieldSpec::new(
                BIRTHDAY,
                FieldKind::Date,
                required().max(today.format(DATE_FORMAT).to_string()),
                "Please enter a valid birthday.",
            ),
            FieldSpec::new(TIMEZONE, FieldKind::Select, required(), "Please select a timezone."),
            FieldSpec::new(ADDRESS, FieldKind::Text, required(), "Please enter your address."),
            FieldSpec::new(STATE, FieldKind::Text, required(), "Please enter your state."),
            FieldSpec::new(ZIP, FieldKind::Text, required(), "Please enter your ZIP code."),
            FieldSpec::new(SSN, FieldKind::Text, required(), "Please enter your SSN."),
        ])
    }

    /// Payment form; contact fields are required only for a new contact
    pub fn payment(new_contact: bool) -> Self {
        Self::new(vec![
            FieldSpec::new(
                PAYMENT_ACCOUNT,
                FieldKind::Select,
                FieldRule::new().required(),
                "Please choose a recipient.",
            ),
            FieldSpec::new(
                CONTACT_ACCOUNT_NUM,
                FieldKind::Text,
                FieldRule::new()
                    .set_required(new_contact)
                    .pattern(ACCOUNT_NUM_PATTERN),
                "Account number must be 10 digits.",
            ),
            FieldSpec::new(
                CONTACT_LABEL,
                FieldKind::Text,
                FieldRule::new().pattern(LABEL_PATTERN),
                "Label must be 1-30 letters, digits or spaces.",
            ),
            FieldSpec::new(
                AMOUNT,
                FieldKind::Number,
                FieldRule::new().required(),
                "Please enter an amount greater than 0.",
            ),
            FieldSpec::new(UUID, FieldKind::Hidden, FieldRule::new().required(), ""),
        ])
    }

    /// Deposit form; external account fields are required only for a new account
    pub fn deposit(new_account: bool) -> Self {
        Self::new(vec![
            FieldSpec::new(
                DEPOSIT_ACCOUNT,
                FieldKind::Select,
                FieldRule::new().required(),
                "Please choose an account.",
            ),
            FieldSpec::new(
                EXTERNAL_ACCOUNT_NUM,
                FieldKind::Text,
                FieldRule::new()
                    .set_required(new_account)
                    .pattern(ACCOUNT_NUM_PATTERN),
                "Account number must be 10 digits.",
            ),
            FieldSpec::new(
                EXTERNAL_ROUTING_NUM,
                FieldKind::Text,
                FieldRule::new()
                    .set_required(new_account)
                    .pattern(ROUTING_NUM_PATTERN),
                "Routing number must be 9 digits.",
            ),
            FieldSpec::new(
                EXTERNAL_LABEL,
                FieldKind::Text,
                FieldRule::new().pattern(LABEL_PATTERN),
                "Label must be 1-30 letters, digits or spaces.",
            ),
            FieldSpec::new(
                AMOUNT,
                FieldKind::Number,
                FieldRule::new().required(),
                "Please enter an amount greater than 0.",
            ),
            FieldSpec::new(UUID, FieldKind::Hidden, FieldRule::new().required(), ""),
        ])
    }
}

/// Outcome of a submit attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDecision {
    /// False when the default submission must be suppressed
    pub proceed: bool,
    pub errors: Vec<FieldError>,
    /// Page-level alert banner (signup password mismatch)
    pub show_alert: bool,
}

impl SubmitDecision {
    pub fn error_for(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    /// Short reason for a blocked submission, for banners and logs
    pub fn reason(&self) -> Option<String> {
        self.errors.first().map(|e| match &e.violation {
            Violation::Custom(msg) => msg.clone(),
            _ if e.message.is_empty() => format!("invalid {}", e.field),
            _ => e.message.clone(),
        })
    }
}

/// Submit-time controller for one form instance
#[derive(Debug, Clone)]
pub struct FormController {
    kind: FormKind,
    schema: FormSchema,
    was_validated: bool,
    alert_visible: bool,
}

impl FormController {
    pub fn new(kind: FormKind, schema: FormSchema) -> Self {
        Self {
            kind,
            schema,
            was_validated: false,
            alert_visible: false,
        }
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut FormSchema {
        &mut self.schema
    }

    /// Whether inline feedback is visible
    pub fn was_validated(&self) -> bool {
        self.was_validated
    }

    pub fn alert_visible(&self) -> bool {
        self.alert_visible
    }

    /// Hide inline feedback again
    pub fn clear_validated(&mut self) {
        self.was_validated = false;
    }

    /// Handle a submit event.
    ///
    /// Field values are never modified; only the visual flags change.
    pub fn submit(&mut self, form: &FormState) -> SubmitDecision {
        let mut errors = self.schema.check(form);

        if let Some(amount_field) = self.kind.amount_field() {
            if errors.iter().all(|e| e.field != amount_field)
                && !is_positive_amount(form.get(amount_field))
            {
                errors.push(FieldError {
                    field: amount_field.to_string(),
                    violation: Violation::Custom("invalid amount".to_string()),
                    message: self
                        .schema
                        .field(amount_field)
                        .map(|f| f.feedback.clone())
                        .unwrap_or_default(),
                });
            }
        }

        let mut show_alert = false;
        if self.kind == FormKind::Signup && form.get(PASSWORD) != form.get(PASSWORD_REPEAT) {
            show_alert = true;
            for field in [PASSWORD, PASSWORD_REPEAT] {
                errors.retain(|e| e.field != field);
                errors.push(FieldError {
                    field: field.to_string(),
                    violation: Violation::Custom("passwords do not match".to_string()),
                    message: "Passwords do not match.".to_string(),
                });
            }
        }

        if show_alert {
            self.alert_visible = true;
        }
        self.was_validated = true;

        SubmitDecision {
            proceed: errors.is_empty(),
            errors,
            show_alert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_form() -> FormState {
        FormState::new()
            .with(USERNAME, "testuser")
            .with(PASSWORD, "secret")
            .with(PASSWORD_REPEAT, "secret")
            .with(FIRSTNAME, "Test")
            .with(LASTNAME, "User")
            .with(BIRTHDAY, "1990-01-31")
            .with(TIMEZONE, "-5")
            .with(ADDRESS, "1 Main St")
            .with(STATE, "CA")
            .with(ZIP, "94000")
            .with(SSN, "111-22-3333")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_login_requires_both_fields() {
        let mut ctl = FormController::new(FormKind::Login, FormSchema::login());
        assert!(!ctl.was_validated());

        let decision = ctl.submit(&FormState::new().with(USERNAME, "alice"));
        assert!(!decision.proceed);
        assert_eq!(decision.errors.len(), 1);
        assert_eq!(decision.errors[0].field, PASSWORD);
        assert!(ctl.was_validated());

        let ok = ctl.submit(&FormState::new().with(USERNAME, "alice").with(PASSWORD, "pw"));
        assert!(ok.proceed);
        assert!(ctl.was_validated());
    }

    #[test]
    fn test_signup_valid() {
        let mut ctl = FormController::new(FormKind::Signup, FormSchema::signup(today()));
        let decision = ctl.submit(&signup_form());
        assert!(decision.proceed, "{:?}", decision.errors);
        assert!(!decision.show_alert);
        assert!(!ctl.alert_visible());
    }

    #[test]
    fn test_signup_password_mismatch_shows_alert() {
        let mut ctl = FormController::new(FormKind::Signup, FormSchema::signup(today()));
        let form = signup_form().with(PASSWORD_REPEAT, "different");
        let decision = ctl.submit(&form);

        assert!(!decision.proceed);
        assert!(decision.show_alert);
        assert!(ctl.alert_visible());
        assert!(decision.error_for(PASSWORD).is_some());
        assert!(decision.error_for(PASSWORD_REPEAT).is_some());
        assert_eq!(decision.reason().as_deref(), Some("passwords do not match"));
    }

    #[test]
    fn test_signup_birthday_in_future_blocked() {
        let mut ctl = FormController::new(FormKind::Signup, FormSchema::signup(today()));
        let decision = ctl.submit(&signup_form().with(BIRTHDAY, "2024-06-02"));
        assert!(!decision.proceed);
        assert_eq!(
            decision.error_for(BIRTHDAY).map(|e| &e.violation),
            Some(&Violation::RangeOverflow)
        );
    }

    #[test]
    fn test_signup_bad_username() {
        let mut ctl = FormController::new(FormKind::Signup, FormSchema::signup(today()));
        let decision = ctl.submit(&signup_form().with(USERNAME, "a"));
        assert_eq!(
            decision.error_for(USERNAME).map(|e| &e.violation),
            Some(&Violation::PatternMismatch)
        );
    }

    #[test]
    fn test_form_state_reset() {
        let mut form = FormState::new().with(AMOUNT, "5");
        assert_eq!(form.get(AMOUNT), "5");
        form.reset();
        assert_eq!(form.get(AMOUNT), "");
        assert_eq!(form.value(AMOUNT), None);
    }
}

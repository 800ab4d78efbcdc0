//! Page models for the login and signup pages

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::constraint::DATE_FORMAT;
use super::form::FormSchema;

/// Query string that makes the login page show its failure banner
pub const LOGIN_FAILED_SEARCH: &str = "?msg=Login+Failed";

/// Query message sent back after a failed login
pub const LOGIN_FAILED_MSG: &str = "Login Failed";

/// Query message sent back after a failed signup
pub const SIGNUP_FAILED_MSG: &str = "Error: Account creation failed";

/// Whether a page's search string (`?...`) asks for the login failure banner
pub fn shows_login_failed(search: &str) -> bool {
    search == LOGIN_FAILED_SEARCH
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPage {
    pub bank_name: String,
    pub alert_visible: bool,
    pub message: Option<String>,
    pub schema: FormSchema,
}

impl LoginPage {
    /// `search` is the raw query including its leading `?`, or empty
    pub fn new(bank_name: impl Into<String>, search: &str, message: Option<String>) -> Self {
        Self {
            bank_name: bank_name.into(),
            alert_visible: shows_login_failed(search),
            message,
            schema: FormSchema::login(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupPage {
    pub bank_name: String,
    /// Latest selectable birthday (today)
    pub birthday_max: String,
    pub schema: FormSchema,
}

impl SignupPage {
    pub fn new(bank_name: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            bank_name: bank_name.into(),
            birthday_max: today.format(DATE_FORMAT).to_string(),
            schema: FormSchema::signup(today),
        }
    }
}

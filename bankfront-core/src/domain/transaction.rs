//! Ledger transaction models

use std::collections::HashMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::account::Contact;
use super::token::IdempotencyToken;

/// Timestamp format used by the transaction history service
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// A transfer submitted to the ledger writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from_account_num: String,
    pub from_routing_num: String,
    pub to_account_num: String,
    pub to_routing_num: String,
    /// Amount in cents
    pub amount: i64,
    pub uuid: IdempotencyToken,
}

/// One row of the account's transaction history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
    pub from_account_num: String,
    pub from_routing_num: String,
    pub to_account_num: String,
    pub to_routing_num: String,
    pub amount: i64,
    pub timestamp: String,
    /// Label of the counterparty, filled in from the user's contacts
    #[serde(default)]
    pub account_label: Option<String>,
}

impl HistoryEntry {
    /// True when money left `account_id`
    pub fn is_debit_for(&self, account_id: &str) -> bool {
        self.from_account_num == account_id
    }
}

/// Set each entry's `account_label` to the label of the contact on the other
/// side of the transaction, or `None` when the counterparty is not a contact.
pub fn populate_contact_labels(account_id: &str, history: &mut [HistoryEntry], contacts: &[Contact]) {
    let labels: HashMap<&str, &str> = contacts
        .iter()
        .map(|c| (c.account_num.as_str(), c.label.as_str()))
        .collect();

    for entry in history.iter_mut() {
        let counterparty = if entry.to_account_num == account_id {
            Some(entry.from_account_num.as_str())
        } else if entry.from_account_num == account_id {
            Some(entry.to_account_num.as_str())
        } else {
            None
        };
        if let Some(counterparty) = counterparty {
            entry.account_label = labels.get(counterparty).map(|l| l.to_string());
        }
    }
}

/// Day of month ("05") of a history timestamp
pub fn format_timestamp_day(timestamp: &str) -> Option<String> {
    DateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.format("%d").to_string())
}

/// Abbreviated month ("Jan") of a history timestamp
pub fn format_timestamp_month(timestamp: &str) -> Option<String> {
    DateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.format("%b").to_string())
}

//! Home page model: balance, labelled history, contacts and fresh modals

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::modal::NEW_OPTION;
use crate::domain::money::format_currency;
use crate::domain::transaction::{
    format_timestamp_day, format_timestamp_month, populate_contact_labels,
};
use crate::domain::{Contact, HistoryEntry, HomeModals, ModalView, Session};
use crate::ports::BankBackend;

/// One history row as the page shows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    pub debit: bool,
    pub amount_display: String,
    pub day: Option<String>,
    pub month: Option<String>,
}

/// A selector option in one of the modals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeView {
    pub account_id: String,
    pub name: String,
    /// Cents; absent when the balance service did not answer
    pub balance: Option<i64>,
    pub balance_display: String,
    /// Absent when the history service did not answer
    pub history: Option<Vec<HistoryRow>>,
    pub contacts: Vec<Contact>,
    pub payment_options: Vec<SelectOption>,
    pub deposit_options: Vec<SelectOption>,
    pub payment_modal: ModalView,
    pub deposit_modal: ModalView,
    pub message: Option<String>,
}

pub struct HomeService {
    backend: Arc<dyn BankBackend>,
}

impl HomeService {
    pub fn new(backend: Arc<dyn BankBackend>) -> Self {
        Self { backend }
    }

    /// Fetch the three reads concurrently; a failed read degrades to "unknown"
    pub async fn load(&self, session: &Session, message: Option<String>) -> HomeView {
        let account_id = session.account_id();
        let (balance, history, contacts) = tokio::join!(
            self.backend.get_balance(session, account_id),
            self.backend.get_transactions(session, account_id),
            self.backend.get_contacts(session, session.username()),
        );

        let balance = balance
            .map_err(|e| error!("Error retrieving balance: {}", e))
            .ok();
        let history = history
            .map_err(|e| error!("Error retrieving transaction history: {}", e))
            .ok();
        let contacts = contacts
            .map_err(|e| error!("Error retrieving contacts: {}", e))
            .unwrap_or_default();
        debug!("Loaded home page data");

        let history = history.map(|mut entries| {
            populate_contact_labels(account_id, &mut entries, &contacts);
            entries
                .into_iter()
                .map(|entry| history_row(account_id, entry))
                .collect()
        });

        let payment_options = payment_options(&contacts);
        let deposit_options = deposit_options(&contacts);
        let modals = HomeModals::new(
            first_value(&payment_options),
            first_value(&deposit_options),
        );

        HomeView {
            account_id: account_id.to_string(),
            name: session.claims.name.clone(),
            balance,
            balance_display: format_currency(balance),
            history,
            contacts,
            payment_options,
            deposit_options,
            payment_modal: modals.payment.view(),
            deposit_modal: modals.deposit.view(),
            message,
        }
    }
}

fn history_row(account_id: &str, entry: HistoryEntry) -> HistoryRow {
    let debit = entry.is_debit_for(account_id);
    let signed = if debit { -entry.amount } else { entry.amount };
    HistoryRow {
        debit,
        amount_display: format_currency(Some(signed)),
        day: format_timestamp_day(&entry.timestamp),
        month: format_timestamp_month(&entry.timestamp),
        entry,
    }
}

/// Local contacts, then "add new"
fn payment_options(contacts: &[Contact]) -> Vec<SelectOption> {
    contacts
        .iter()
        .filter(|c| !c.is_external)
        .map(|c| SelectOption {
            label: format!("{} - {}", c.label, c.account_num),
            value: c.account_num.to_string(),
        })
        .chain(std::iter::once(new_option("New Recipient")))
        .collect()
}

/// External accounts, then "add new"
fn deposit_options(contacts: &[Contact]) -> Vec<SelectOption> {
    contacts
        .iter()
        .filter(|c| c.is_external)
        .map(|c| SelectOption {
            label: format!("{} - {} / {}", c.label, c.account_num, c.routing_num),
            value: c.external_account().to_selector_value(),
        })
        .chain(std::iter::once(new_option("New External Account")))
        .collect()
}

fn new_option(label: &str) -> SelectOption {
    SelectOption {
        label: label.to_string(),
        value: NEW_OPTION.to_string(),
    }
}

fn first_value(options: &[SelectOption]) -> String {
    options
        .first()
        .map(|o| o.value.clone())
        .unwrap_or_else(|| NEW_OPTION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::{DemoBackend, DEMO_ACCOUNT, DEMO_USERNAME};
    use crate::domain::result::{Error, Result};
    use crate::domain::{Claims, FormState, ModalMode, TransactionRequest};
    use async_trait::async_trait;

    fn session() -> Session {
        Session {
            token: String::new(),
            claims: Claims {
                user: DEMO_USERNAME.into(),
                acct: DEMO_ACCOUNT.into(),
                name: "Test User".into(),
                iat: 0,
                exp: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_home_view_from_demo_bank() {
        let backend = Arc::new(DemoBackend::new(b"secret", "883745000").unwrap());
        let view = HomeService::new(backend).load(&session(), Some("hi".into())).await;

        assert!(view.balance.is_some());
        assert!(view.balance_display.starts_with('$'));
        let history = view.history.unwrap();
        assert!(history.iter().any(|r| r.entry.account_label.as_deref() == Some("Alice")));
        assert!(history.iter().all(|r| r.day.is_some() && r.month.is_some()));

        assert_eq!(view.payment_options[0].value, "1033623433");
        assert_eq!(view.payment_options.last().unwrap().value, NEW_OPTION);
        assert_eq!(view.payment_modal.mode, ModalMode::Existing);
        assert_ne!(view.payment_modal.uuid, view.deposit_modal.uuid);
        assert_eq!(view.message.as_deref(), Some("hi"));
    }

    struct DownBackend;

    #[async_trait]
    impl BankBackend for DownBackend {
        async fn login(&self, _: &str, _: &str) -> Result<String> {
            Err(Error::backend("down"))
        }
        async fn create_user(&self, _: &FormState) -> Result<()> {
            Err(Error::backend("down"))
        }
        async fn submit_transaction(&self, _: &Session, _: &TransactionRequest) -> Result<()> {
            Err(Error::backend("down"))
        }
        async fn get_balance(&self, _: &Session, _: &str) -> Result<i64> {
            Err(Error::backend("down"))
        }
        async fn get_transactions(&self, _: &Session, _: &str) -> Result<Vec<HistoryEntry>> {
            Err(Error::backend("down"))
        }
        async fn get_contacts(&self, _: &Session, _: &str) -> Result<Vec<Contact>> {
            Err(Error::backend("down"))
        }
        async fn add_contact(&self, _: &Session, _: &str, _: &Contact) -> Result<()> {
            Err(Error::backend("down"))
        }
    }

    #[tokio::test]
    async fn test_failed_reads_degrade() {
        let view = HomeService::new(Arc::new(DownBackend)).load(&session(), None).await;
        assert_eq!(view.balance, None);
        assert_eq!(view.balance_display, "$---");
        assert!(view.history.is_none());
        assert!(view.contacts.is_empty());
        assert_eq!(view.payment_modal.mode, ModalMode::New);
        assert_eq!(view.deposit_modal.mode, ModalMode::New);
    }
}

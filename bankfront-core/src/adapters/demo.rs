//! In-memory demo bank
//!
//! Stands in for the user, ledger, balance, history and contacts services
//! so the frontend can run without a cluster. It applies the same
//! acceptance rules as the real services and issues HS256 session tokens
//! signed with a secret shared with the frontend's verifier.
//!
//! Seeded data:
//! - `testuser` / `bankofanthos` (account 1011226111) with two local
//!   contacts, one external account and a few months of history
//! - `alice` / `password` (account 1033623433)

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::Rng;
use regex::Regex;
use tracing::{debug, info};

use crate::domain::form::{
    ADDRESS, BIRTHDAY, FIRSTNAME, LASTNAME, PASSWORD, PASSWORD_REPEAT, SSN, STATE, TIMEZONE,
    USERNAME, ZIP,
};
use crate::domain::result::{Error, Result};
use crate::domain::{
    AccountNumber, Claims, Contact, ContactLabel, FormState, HistoryEntry, IdempotencyToken,
    RoutingNumber, Session, TransactionRequest,
};
use crate::ports::BankBackend;

pub const DEMO_USERNAME: &str = "testuser";
pub const DEMO_PASSWORD: &str = "bankofanthos";
pub const DEMO_ACCOUNT: &str = "1011226111";

const TOKEN_TTL_SECS: i64 = 3600;
const EXTERNAL_ACCOUNT: &str = "9099791699";
const EXTERNAL_ROUTING: &str = "808889588";
const HISTORY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

const SIGNUP_FIELDS: [&str; 11] = [
    USERNAME,
    PASSWORD,
    PASSWORD_REPEAT,
    FIRSTNAME,
    LASTNAME,
    BIRTHDAY,
    TIMEZONE,
    ADDRESS,
    STATE,
    ZIP,
    SSN,
];

#[derive(Debug, Clone)]
struct DemoUser {
    password: String,
    account_id: String,
    name: String,
}

#[derive(Debug, Default)]
struct Bank {
    users: HashMap<String, DemoUser>,
    balances: HashMap<String, i64>,
    /// Oldest first
    history: Vec<HistoryEntry>,
    contacts: HashMap<String, Vec<Contact>>,
    seen_uuids: HashSet<IdempotencyToken>,
    next_transaction_id: i64,
}

impl Bank {
    fn record(&mut self, tx: &TransactionRequest, at: DateTime<Utc>, local_routing: &str) {
        if tx.from_routing_num == local_routing {
            *self.balances.entry(tx.from_account_num.clone()).or_insert(0) -= tx.amount;
        }
        if tx.to_routing_num == local_routing {
            *self.balances.entry(tx.to_account_num.clone()).or_insert(0) += tx.amount;
        }
        self.next_transaction_id += 1;
        self.seen_uuids.insert(tx.uuid);
        self.history.push(HistoryEntry {
            transaction_id: Some(self.next_transaction_id),
            from_account_num: tx.from_account_num.clone(),
            from_routing_num: tx.from_routing_num.clone(),
            to_account_num: tx.to_account_num.clone(),
            to_routing_num: tx.to_routing_num.clone(),
            amount: tx.amount,
            timestamp: at.format(HISTORY_TIMESTAMP_FORMAT).to_string(),
            account_label: None,
        });
    }

    fn add_user(&mut self, username: &str, password: &str, account_id: &str, name: &str) {
        self.users.insert(
            username.to_string(),
            DemoUser {
                password: password.to_string(),
                account_id: account_id.to_string(),
                name: name.to_string(),
            },
        );
        self.balances.entry(account_id.to_string()).or_insert(0);
    }

    fn account_in_use(&self, account_id: &str) -> bool {
        self.users.values().any(|u| u.account_id == account_id)
    }
}

/// Demo backend holding the whole bank in memory
pub struct DemoBackend {
    bank: Mutex<Bank>,
    encoding_key: EncodingKey,
    local_routing: String,
    username_pattern: Regex,
}

impl DemoBackend {
    /// Create a seeded demo bank signing tokens with `secret`
    pub fn new(secret: &[u8], local_routing: impl Into<String>) -> Result<Self> {
        let local_routing = local_routing.into();
        RoutingNumber::parse(&local_routing)?;
        let backend = Self {
            bank: Mutex::new(Bank::default()),
            encoding_key: EncodingKey::from_secret(secret),
            local_routing,
            username_pattern: Regex::new(r"^[a-zA-Z0-9_]{2,15}$")
                .map_err(|e| Error::Other(e.to_string()))?,
        };
        backend.seed()?;
        Ok(backend)
    }

    /// Create a demo bank with no users or history
    pub fn empty(secret: &[u8], local_routing: impl Into<String>) -> Result<Self> {
        let local_routing = local_routing.into();
        RoutingNumber::parse(&local_routing)?;
        Ok(Self {
            bank: Mutex::new(Bank::default()),
            encoding_key: EncodingKey::from_secret(secret),
            local_routing,
            username_pattern: Regex::new(r"^[a-zA-Z0-9_]{2,15}$")
                .map_err(|e| Error::Other(e.to_string()))?,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Bank>> {
        self.bank
            .lock()
            .map_err(|_| Error::Other("demo bank lock poisoned".to_string()))
    }

    fn seed(&self) -> Result<()> {
        let mut bank = self.lock()?;
        bank.add_user(DEMO_USERNAME, DEMO_PASSWORD, DEMO_ACCOUNT, "Test User");
        bank.add_user("alice", "password", "1033623433", "Alice Smith");

        let contact = |label: &str, acct: &str, routing: &str, is_external: bool| -> Result<Contact> {
            Ok(Contact {
                label: ContactLabel::parse(label)?,
                account_num: AccountNumber::parse(acct)?,
                routing_num: RoutingNumber::parse(routing)?,
                is_external,
            })
        };
        let routing = self.local_routing.clone();
        bank.contacts.insert(
            DEMO_USERNAME.to_string(),
            vec![
                contact("Alice", "1033623433", &routing, false)?,
                contact("Bob", "1055757655", &routing, false)?,
                contact("External Bank", EXTERNAL_ACCOUNT, EXTERNAL_ROUTING, true)?,
            ],
        );

        // Two paychecks a month from the external account, rent to Alice
        let now = Utc::now();
        for month in (0..3i64).rev() {
            let start = now - Duration::days(month * 30 + 28);
            let transfers = [
                (start, EXTERNAL_ACCOUNT, EXTERNAL_ROUTING, DEMO_ACCOUNT, 250_000),
                (start + Duration::days(2), DEMO_ACCOUNT, routing.as_str(), "1033623433", 120_000),
                (start + Duration::days(14), EXTERNAL_ACCOUNT, EXTERNAL_ROUTING, DEMO_ACCOUNT, 250_000),
                (start + Duration::days(20), DEMO_ACCOUNT, routing.as_str(), "1055757655", 4_550),
            ];
            for (at, from, from_routing, to, amount) in transfers {
                let to_routing = routing.clone();
                let tx = TransactionRequest {
                    from_account_num: from.to_string(),
                    from_routing_num: from_routing.to_string(),
                    to_account_num: to.to_string(),
                    to_routing_num: to_routing,
                    amount,
                    uuid: IdempotencyToken::generate(),
                };
                bank.record(&tx, at, &routing);
            }
        }
        debug!("Seeded demo bank with {} transactions", bank.history.len());
        Ok(())
    }

    fn issue_token(&self, username: &str, user: &DemoUser) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            user: username.to_string(),
            acct: user.account_id.clone(),
            name: user.name.clone(),
            iat,
            exp: iat + TOKEN_TTL_SECS,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Other(format!("failed to sign token: {}", e)))
    }

    /// Ledger writer acceptance rules, in the order the ledger applies them
    fn check_transaction(&self, bank: &Bank, session: &Session, tx: &TransactionRequest) -> Result<()> {
        if bank.seen_uuids.contains(&tx.uuid) {
            return Err(Error::rejected("duplicate transaction uuid"));
        }
        let numbers_valid = AccountNumber::parse(&tx.from_account_num).is_ok()
            && AccountNumber::parse(&tx.to_account_num).is_ok()
            && RoutingNumber::parse(&tx.from_routing_num).is_ok()
            && RoutingNumber::parse(&tx.to_routing_num).is_ok();
        if !numbers_valid {
            return Err(Error::rejected("invalid account details"));
        }
        if tx.from_routing_num == self.local_routing && tx.from_account_num != session.account_id() {
            return Err(Error::rejected("sender not authenticated"));
        }
        if tx.from_account_num == tx.to_account_num && tx.from_routing_num == tx.to_routing_num {
            return Err(Error::rejected("can't send to self"));
        }
        if tx.amount <= 0 {
            return Err(Error::rejected("invalid amount"));
        }
        if tx.from_routing_num == self.local_routing {
            let balance = bank.balances.get(&tx.from_account_num).copied().unwrap_or(0);
            if balance < tx.amount {
                return Err(Error::rejected("insufficient balance"));
            }
            if balance.checked_sub(tx.amount).is_none() {
                return Err(Error::rejected("invalid amount"));
            }
        }
        if tx.to_routing_num == self.local_routing {
            let balance = bank.balances.get(&tx.to_account_num).copied().unwrap_or(0);
            if balance.checked_add(tx.amount).is_none() {
                return Err(Error::rejected("invalid amount"));
            }
        }
        Ok(())
    }

    fn check_new_user(&self, bank: &Bank, form: &FormState) -> Result<()> {
        if SIGNUP_FIELDS.iter().any(|f| form.value(f).is_none()) {
            return Err(Error::rejected("missing required field(s)"));
        }
        if SIGNUP_FIELDS.iter().any(|f| form.get(f).trim().is_empty()) {
            return Err(Error::rejected("missing value for input field(s)"));
        }
        let username = form.get(USERNAME);
        if !self.username_pattern.is_match(username) {
            return Err(Error::rejected(
                "username must contain 2-15 alphanumeric characters or underscores",
            ));
        }
        if form.get(PASSWORD) != form.get(PASSWORD_REPEAT) {
            return Err(Error::rejected("passwords do not match"));
        }
        if bank.users.contains_key(username) {
            return Err(Error::rejected(format!("user {} already exists", username)));
        }
        Ok(())
    }

    fn check_owner(session: &Session, account_id: &str) -> Result<()> {
        if session.account_id() != account_id {
            return Err(Error::rejected("authentication denied"));
        }
        Ok(())
    }
}

#[async_trait]
impl BankBackend for DemoBackend {
    async fn login(&self, username: &str, password: &str) -> Result<String> {
        let user = {
            let bank = self.lock()?;
            let user = bank
                .users
                .get(username)
                .ok_or_else(|| Error::rejected(format!("user {} does not exist", username)))?;
            if user.password != password {
                return Err(Error::rejected("invalid login"));
            }
            user.clone()
        };
        info!("Demo login succeeded");
        self.issue_token(username, &user)
    }

    async fn create_user(&self, form: &FormState) -> Result<()> {
        let mut bank = self.lock()?;
        self.check_new_user(&bank, form)?;

        let mut rng = rand::thread_rng();
        let account_id = loop {
            let candidate = rng.gen_range(1_000_000_000u64..10_000_000_000).to_string();
            if !bank.account_in_use(&candidate) {
                break candidate;
            }
        };
        let name = format!("{} {}", form.get(FIRSTNAME), form.get(LASTNAME));
        bank.add_user(form.get(USERNAME), form.get(PASSWORD), &account_id, &name);
        info!("Demo user created");
        Ok(())
    }

    async fn submit_transaction(&self, session: &Session, tx: &TransactionRequest) -> Result<()> {
        let mut bank = self.lock()?;
        self.check_transaction(&bank, session, tx)?;
        bank.record(tx, Utc::now(), &self.local_routing);
        Ok(())
    }

    async fn get_balance(&self, session: &Session, account_id: &str) -> Result<i64> {
        Self::check_owner(session, account_id)?;
        let bank = self.lock()?;
        Ok(bank.balances.get(account_id).copied().unwrap_or(0))
    }

    async fn get_transactions(&self, session: &Session, account_id: &str) -> Result<Vec<HistoryEntry>> {
        Self::check_owner(session, account_id)?;
        let bank = self.lock()?;
        let routing = self.local_routing.as_str();
        Ok(bank
            .history
            .iter()
            .rev()
            .filter(|e| {
                (e.from_account_num == account_id && e.from_routing_num == routing)
                    || (e.to_account_num == account_id && e.to_routing_num == routing)
            })
            .cloned()
            .collect())
    }

    async fn get_contacts(&self, session: &Session, username: &str) -> Result<Vec<Contact>> {
        if session.username() != username {
            return Err(Error::rejected("authentication denied"));
        }
        let bank = self.lock()?;
        Ok(bank.contacts.get(username).cloned().unwrap_or_default())
    }

    async fn add_contact(&self, session: &Session, username: &str, contact: &Contact) -> Result<()> {
        if session.username() != username {
            return Err(Error::rejected("authentication denied"));
        }
        if contact.is_external && contact.routing_num.as_str() == self.local_routing {
            return Err(Error::rejected("invalid routing number"));
        }
        if contact.account_num.as_str() == session.account_id()
            && contact.routing_num.as_str() == self.local_routing
        {
            return Err(Error::rejected("may not add yourself to contacts"));
        }

        let mut bank = self.lock()?;
        let contacts = bank.contacts.entry(username.to_string()).or_default();
        if contacts
            .iter()
            .any(|c| c.account_num == contact.account_num && c.routing_num == contact.routing_num)
        {
            return Err(Error::rejected("account already exists as a contact"));
        }
        if contacts.iter().any(|c| c.label == contact.label) {
            return Err(Error::rejected("contact label already exists"));
        }
        contacts.push(contact.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"demo-test-secret";
    const ROUTING: &str = "883745000";

    fn session_for(acct: &str, user: &str) -> Session {
        Session {
            token: String::new(),
            claims: Claims {
                user: user.to_string(),
                acct: acct.to_string(),
                name: "Test User".to_string(),
                iat: 0,
                exp: 0,
            },
        }
    }

    fn transfer(from: &str, to: &str, amount: i64) -> TransactionRequest {
        TransactionRequest {
            from_account_num: from.to_string(),
            from_routing_num: ROUTING.to_string(),
            to_account_num: to.to_string(),
            to_routing_num: ROUTING.to_string(),
            amount,
            uuid: IdempotencyToken::generate(),
        }
    }

    #[tokio::test]
    async fn test_login() {
        let backend = DemoBackend::new(SECRET, ROUTING).unwrap();
        let token = backend.login(DEMO_USERNAME, DEMO_PASSWORD).await.unwrap();
        assert_eq!(token.split('.').count(), 3);

        let err = backend.login(DEMO_USERNAME, "wrong").await.unwrap_err();
        assert_eq!(err.user_reason(), Some("invalid login"));
        assert!(backend.login("nobody", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_seeded_balance_matches_history() {
        let backend = DemoBackend::new(SECRET, ROUTING).unwrap();
        let session = session_for(DEMO_ACCOUNT, DEMO_USERNAME);
        let balance = backend.get_balance(&session, DEMO_ACCOUNT).await.unwrap();
        let history = backend.get_transactions(&session, DEMO_ACCOUNT).await.unwrap();

        let net: i64 = history
            .iter()
            .map(|e| if e.is_debit_for(DEMO_ACCOUNT) { -e.amount } else { e.amount })
            .sum();
        assert_eq!(balance, net);
        assert!(balance > 0);
        assert!(history[0].timestamp >= history[history.len() - 1].timestamp);
    }

    #[tokio::test]
    async fn test_ledger_rules() {
        let backend = DemoBackend::new(SECRET, ROUTING).unwrap();
        let session = session_for(DEMO_ACCOUNT, DEMO_USERNAME);
        let reason = |r: Result<()>| r.unwrap_err().user_reason().map(str::to_string);

        let bad_number = transfer(DEMO_ACCOUNT, "123", 100);
        assert_eq!(
            reason(backend.submit_transaction(&session, &bad_number).await).as_deref(),
            Some("invalid account details")
        );

        let not_mine = transfer("1033623433", DEMO_ACCOUNT, 100);
        assert_eq!(
            reason(backend.submit_transaction(&session, &not_mine).await).as_deref(),
            Some("sender not authenticated")
        );

        let to_self = transfer(DEMO_ACCOUNT, DEMO_ACCOUNT, 100);
        assert_eq!(
            reason(backend.submit_transaction(&session, &to_self).await).as_deref(),
            Some("can't send to self")
        );

        let zero = transfer(DEMO_ACCOUNT, "1033623433", 0);
        assert_eq!(
            reason(backend.submit_transaction(&session, &zero).await).as_deref(),
            Some("invalid amount")
        );

        let too_much = transfer(DEMO_ACCOUNT, "1033623433", i64::MAX);
        assert_eq!(
            reason(backend.submit_transaction(&session, &too_much).await).as_deref(),
            Some("insufficient balance")
        );
    }

    #[tokio::test]
    async fn test_duplicate_uuid_rejected() {
        let backend = DemoBackend::new(SECRET, ROUTING).unwrap();
        let session = session_for(DEMO_ACCOUNT, DEMO_USERNAME);
        let before = backend.get_balance(&session, DEMO_ACCOUNT).await.unwrap();

        let tx = transfer(DEMO_ACCOUNT, "1033623433", 1_000);
        backend.submit_transaction(&session, &tx).await.unwrap();
        let err = backend.submit_transaction(&session, &tx).await.unwrap_err();
        assert_eq!(err.user_reason(), Some("duplicate transaction uuid"));

        let after = backend.get_balance(&session, DEMO_ACCOUNT).await.unwrap();
        assert_eq!(after, before - 1_000);
    }

    #[tokio::test]
    async fn test_deposit_overflowing_balance_rejected() {
        let backend = DemoBackend::new(SECRET, ROUTING).unwrap();
        let session = session_for(DEMO_ACCOUNT, DEMO_USERNAME);
        let before = backend.get_balance(&session, DEMO_ACCOUNT).await.unwrap();

        let deposit = TransactionRequest {
            from_account_num: EXTERNAL_ACCOUNT.to_string(),
            from_routing_num: EXTERNAL_ROUTING.to_string(),
            to_account_num: DEMO_ACCOUNT.to_string(),
            to_routing_num: ROUTING.to_string(),
            amount: i64::MAX,
            uuid: IdempotencyToken::generate(),
        };
        let err = backend.submit_transaction(&session, &deposit).await.unwrap_err();
        assert_eq!(err.user_reason(), Some("invalid amount"));

        // The bank keeps answering and nothing was recorded
        assert_eq!(backend.get_balance(&session, DEMO_ACCOUNT).await.unwrap(), before);
        assert!(backend.login(DEMO_USERNAME, DEMO_PASSWORD).await.is_ok());
        let small = TransactionRequest { amount: 100, uuid: IdempotencyToken::generate(), ..deposit };
        backend.submit_transaction(&session, &small).await.unwrap();
        assert_eq!(backend.get_balance(&session, DEMO_ACCOUNT).await.unwrap(), before + 100);
    }

    #[tokio::test]
    async fn test_create_user() {
        let backend = DemoBackend::empty(SECRET, ROUTING).unwrap();
        let mut form: FormState = SIGNUP_FIELDS.iter().map(|f| (*f, "x")).collect();
        form.set(USERNAME, "new_user");
        form.set(PASSWORD, "pw");
        form.set(PASSWORD_REPEAT, "pw");

        backend.create_user(&form).await.unwrap();
        assert!(backend.login("new_user", "pw").await.is_ok());

        let err = backend.create_user(&form).await.unwrap_err();
        assert_eq!(err.user_reason(), Some("user new_user already exists"));

        let mismatch = form.clone().with(USERNAME, "other").with(PASSWORD_REPEAT, "nope");
        let err = backend.create_user(&mismatch).await.unwrap_err();
        assert_eq!(err.user_reason(), Some("passwords do not match"));

        let bad_name = form.clone().with(USERNAME, "a");
        assert!(backend.create_user(&bad_name).await.is_err());

        let blank = form.with(USERNAME, "third").with(SSN, " ");
        let err = backend.create_user(&blank).await.unwrap_err();
        assert_eq!(err.user_reason(), Some("missing value for input field(s)"));
    }

    #[tokio::test]
    async fn test_contact_rules() {
        let backend = DemoBackend::new(SECRET, ROUTING).unwrap();
        let session = session_for(DEMO_ACCOUNT, DEMO_USERNAME);
        let contact = |label: &str, acct: &str, routing: &str, is_external: bool| Contact {
            label: ContactLabel::parse(label).unwrap(),
            account_num: AccountNumber::parse(acct).unwrap(),
            routing_num: RoutingNumber::parse(routing).unwrap(),
            is_external,
        };

        let carol = contact("Carol", "1077441377", ROUTING, false);
        backend.add_contact(&session, DEMO_USERNAME, &carol).await.unwrap();

        let same_label = contact("Carol", "1077441378", ROUTING, false);
        assert!(backend.add_contact(&session, DEMO_USERNAME, &same_label).await.is_err());

        let same_account = contact("Carol Two", "1077441377", ROUTING, false);
        assert!(backend.add_contact(&session, DEMO_USERNAME, &same_account).await.is_err());

        let local_external = contact("Savings", "1234567890", ROUTING, true);
        let err = backend
            .add_contact(&session, DEMO_USERNAME, &local_external)
            .await
            .unwrap_err();
        assert_eq!(err.user_reason(), Some("invalid routing number"));

        let myself = contact("Me", DEMO_ACCOUNT, ROUTING, false);
        assert!(backend.add_contact(&session, DEMO_USERNAME, &myself).await.is_err());

        let contacts = backend.get_contacts(&session, DEMO_USERNAME).await.unwrap();
        assert_eq!(contacts.len(), 4);
        assert!(backend.get_contacts(&session, "alice").await.is_err());
    }
}

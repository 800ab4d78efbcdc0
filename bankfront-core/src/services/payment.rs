//! Payment flow: pay a contact (or a newly entered account) from the
//! session's account

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::domain::form::{AMOUNT, CONTACT_ACCOUNT_NUM, CONTACT_LABEL, PAYMENT_ACCOUNT, UUID};
use crate::domain::money::{parse_amount, to_cents};
use crate::domain::result::Result;
use crate::domain::{
    AccountNumber, AccountSelection, Contact, ContactLabel, FormKind, FormState, IdempotencyToken,
    RoutingNumber, Session, TransactionRequest,
};
use crate::ports::BankBackend;
use crate::services::ValidationService;

pub struct PaymentService {
    backend: Arc<dyn BankBackend>,
    local_routing: RoutingNumber,
    validation: ValidationService,
}

impl PaymentService {
    pub fn new(backend: Arc<dyn BankBackend>, local_routing: RoutingNumber) -> Self {
        Self {
            backend,
            local_routing,
            validation: ValidationService::new(),
        }
    }

    /// Validate and submit a posted payment form
    pub async fn submit(&self, session: &Session, form: &FormState, today: NaiveDate) -> Result<TransactionRequest> {
        debug!("Submitting payment");
        let result = self.try_submit(session, form, today).await;
        match &result {
            Ok(_) => info!("Payment initiated successfully"),
            Err(e) => error!("Error submitting payment: {}", e),
        }
        result
    }

    async fn try_submit(&self, session: &Session, form: &FormState, today: NaiveDate) -> Result<TransactionRequest> {
        self.validation.check(FormKind::Payment, form, today)?;

        let recipient = match AccountSelection::parse_payment(form.get(PAYMENT_ACCOUNT))? {
            AccountSelection::Existing(account) => account,
            AccountSelection::New => {
                let account = AccountNumber::parse(form.get(CONTACT_ACCOUNT_NUM))?;
                let label = form.get(CONTACT_LABEL);
                if !label.is_empty() {
                    let contact = Contact {
                        label: ContactLabel::parse(label)?,
                        account_num: account.clone(),
                        routing_num: self.local_routing.clone(),
                        is_external: false,
                    };
                    self.backend
                        .add_contact(session, session.username(), &contact)
                        .await?;
                }
                account
            }
        };

        let tx = TransactionRequest {
            from_account_num: session.account_id().to_string(),
            from_routing_num: self.local_routing.to_string(),
            to_account_num: recipient.to_string(),
            to_routing_num: self.local_routing.to_string(),
            amount: to_cents(parse_amount(form.get(AMOUNT))?)?,
            uuid: IdempotencyToken::parse(form.get(UUID))?,
        };
        self.backend.submit_transaction(session, &tx).await?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::{DemoBackend, DEMO_ACCOUNT, DEMO_USERNAME};
    use crate::domain::modal::NEW_OPTION;
    use crate::domain::result::Error;
    use crate::domain::Claims;

    const ROUTING: &str = "883745000";

    fn setup() -> (Arc<DemoBackend>, PaymentService, Session) {
        let backend = Arc::new(DemoBackend::new(b"secret", ROUTING).unwrap());
        let service = PaymentService::new(backend.clone(), RoutingNumber::parse(ROUTING).unwrap());
        let session = Session {
            token: String::new(),
            claims: Claims {
                user: DEMO_USERNAME.into(),
                acct: DEMO_ACCOUNT.into(),
                name: "Test User".into(),
                iat: 0,
                exp: 0,
            },
        };
        (backend, service, session)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn form(account: &str, amount: &str) -> FormState {
        FormState::new()
            .with(PAYMENT_ACCOUNT, account)
            .with(AMOUNT, amount)
            .with(UUID, IdempotencyToken::generate().to_string())
    }

    #[tokio::test]
    async fn test_pay_existing_contact_truncates_cents() {
        let (backend, service, session) = setup();
        let before = backend.get_balance(&session, DEMO_ACCOUNT).await.unwrap();

        let tx = service.submit(&session, &form("1033623433", "12.509"), today()).await.unwrap();
        assert_eq!(tx.amount, 1250);
        assert_eq!(tx.from_account_num, DEMO_ACCOUNT);
        assert_eq!(tx.to_routing_num, ROUTING);

        let after = backend.get_balance(&session, DEMO_ACCOUNT).await.unwrap();
        assert_eq!(after, before - 1250);
    }

    #[tokio::test]
    async fn test_pay_new_contact_adds_labelled_contact() {
        let (backend, service, session) = setup();
        let form = form(NEW_OPTION, "1")
            .with(CONTACT_ACCOUNT_NUM, "1077441377")
            .with(CONTACT_LABEL, "Carol");
        service.submit(&session, &form, today()).await.unwrap();

        let contacts = backend.get_contacts(&session, DEMO_USERNAME).await.unwrap();
        let carol = contacts.iter().find(|c| c.label.as_str() == "Carol").unwrap();
        assert!(!carol.is_external);
        assert_eq!(carol.routing_num.as_str(), ROUTING);
    }

    #[tokio::test]
    async fn test_pay_new_account_without_label_skips_contact() {
        let (backend, service, session) = setup();
        let form = form(NEW_OPTION, "1").with(CONTACT_ACCOUNT_NUM, "1077441377");
        service.submit(&session, &form, today()).await.unwrap();

        let contacts = backend.get_contacts(&session, DEMO_USERNAME).await.unwrap();
        assert_eq!(contacts.len(), 3);
    }

    #[tokio::test]
    async fn test_rejections_carry_reason() {
        let (_backend, service, session) = setup();

        let err = service
            .submit(&session, &form("1033623433", "999999999"), today())
            .await
            .unwrap_err();
        assert_eq!(err.user_reason(), Some("insufficient balance"));

        let err = service.submit(&session, &form("1033623433", "0"), today()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}

//! Deposit flow: pull money from an external account into the session's
//! account

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::domain::form::{
    AMOUNT, DEPOSIT_ACCOUNT, EXTERNAL_ACCOUNT_NUM, EXTERNAL_LABEL, EXTERNAL_ROUTING_NUM, UUID,
};
use crate::domain::money::{parse_amount, to_cents};
use crate::domain::result::{Error, Result};
use crate::domain::{
    AccountNumber, AccountSelection, Contact, ContactLabel, ExternalAccount, FormKind, FormState,
    IdempotencyToken, RoutingNumber, Session, TransactionRequest,
};
use crate::ports::BankBackend;
use crate::services::ValidationService;

pub struct DepositService {
    backend: Arc<dyn BankBackend>,
    local_routing: RoutingNumber,
    validation: ValidationService,
}

impl DepositService {
    pub fn new(backend: Arc<dyn BankBackend>, local_routing: RoutingNumber) -> Self {
        Self {
            backend,
            local_routing,
            validation: ValidationService::new(),
        }
    }

    /// Validate and submit a posted deposit form
    pub async fn submit(&self, session: &Session, form: &FormState, today: NaiveDate) -> Result<TransactionRequest> {
        debug!("Submitting deposit");
        let result = self.try_submit(session, form, today).await;
        match &result {
            Ok(_) => info!("Deposit submitted successfully"),
            Err(e) => error!("Error submitting deposit: {}", e),
        }
        result
    }

    async fn try_submit(&self, session: &Session, form: &FormState, today: NaiveDate) -> Result<TransactionRequest> {
        self.validation.check(FormKind::Deposit, form, today)?;

        let source = match AccountSelection::parse_deposit(form.get(DEPOSIT_ACCOUNT))? {
            AccountSelection::Existing(account) => account,
            AccountSelection::New => {
                let account = ExternalAccount::new(
                    AccountNumber::parse(form.get(EXTERNAL_ACCOUNT_NUM))?,
                    RoutingNumber::parse(form.get(EXTERNAL_ROUTING_NUM))?,
                );
                if account.routing_num == self.local_routing {
                    return Err(Error::validation("invalid routing number"));
                }
                let label = form.get(EXTERNAL_LABEL);
                if !label.is_empty() {
                    let contact = Contact {
                        label: ContactLabel::parse(label)?,
                        account_num: account.account_num.clone(),
                        routing_num: account.routing_num.clone(),
                        is_external: true,
                    };
                    self.backend
                        .add_contact(session, session.username(), &contact)
                        .await?;
                }
                account
            }
        };

        let tx = TransactionRequest {
            from_account_num: source.account_num.to_string(),
            from_routing_num: source.routing_num.to_string(),
            to_account_num: session.account_id().to_string(),
            to_routing_num: self.local_routing.to_string(),
            amount: to_cents(parse_amount(form.get(AMOUNT))?)?,
            uuid: IdempotencyToken::parse(form.get(UUID))?,
        };
        self.backend.submit_transaction(session, &tx).await?;
        Ok(tx)
    }
}

//! HTTP client for the bank's backend services

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::domain::result::{Error, Result};
use crate::domain::{Contact, FormState, HistoryEntry, Session, TransactionRequest};
use crate::ports::BankBackend;

/// Time given to a new transaction to reach the balance and history readers
const PROPAGATION_DELAY: Duration = Duration::from_millis(250);

/// Backend reached over HTTP, one base URL per service
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    timeout: Duration,
    transactions_uri: String,
    userservice_uri: String,
    login_uri: String,
    balances_uri: String,
    history_uri: String,
    contacts_uri: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            timeout: config.backend_timeout,
            transactions_uri: config.transactions_uri.clone(),
            userservice_uri: config.userservice_uri.clone(),
            login_uri: config.login_uri.clone(),
            balances_uri: config.balances_uri.clone(),
            history_uri: config.history_uri.clone(),
            contacts_uri: config.contacts_uri.clone(),
        })
    }

    fn authed(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder.bearer_auth(&session.token).timeout(self.timeout)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| self.map_request_error(e))?;
        Self::check_response_status(response).await
    }

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::backend(format!(
                "request timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            Error::backend(format!("unable to connect: {}", error))
        } else {
            Error::backend(format!("request failed: {}", error))
        }
    }

    /// Turn 4xx/5xx into a rejection carrying the response text
    async fn check_response_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let text = response.text().await.unwrap_or_default();
            let reason = if text.trim().is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                text.trim().to_string()
            };
            return Err(Error::rejected(reason));
        }
        Ok(response)
    }
}

#[async_trait]
impl BankBackend for HttpBackend {
    async fn login(&self, username: &str, password: &str) -> Result<String> {
        debug!("Requesting login token");
        let request = self
            .client
            .get(&self.login_uri)
            .query(&[("username", username), ("password", password)])
            .timeout(self.timeout * 2);
        let response = self.send(request).await?;
        let body: LoginResponse = response.json().await?;
        Ok(body.token)
    }

    async fn create_user(&self, form: &FormState) -> Result<()> {
        debug!("Creating new user");
        let fields: Vec<(&str, &str)> = form.iter().collect();
        let request = self
            .client
            .post(&self.userservice_uri)
            .form(&fields)
            .timeout(self.timeout);
        let response = self.send(request).await?;
        if response.status() != StatusCode::CREATED {
            return Err(Error::rejected(format!(
                "unexpected status {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }

    async fn submit_transaction(&self, session: &Session, tx: &TransactionRequest) -> Result<()> {
        debug!("Submitting transaction");
        let request = self.authed(self.client.post(&self.transactions_uri).json(tx), session);
        self.send(request).await?;
        tokio::time::sleep(PROPAGATION_DELAY).await;
        Ok(())
    }

    async fn get_balance(&self, session: &Session, account_id: &str) -> Result<i64> {
        let url = format!("{}/{}", self.balances_uri, account_id);
        let response = self.send(self.authed(self.client.get(url), session)).await?;
        Ok(response.json().await?)
    }

    async fn get_transactions(&self, session: &Session, account_id: &str) -> Result<Vec<HistoryEntry>> {
        let url = format!("{}/{}", self.history_uri, account_id);
        let response = self.send(self.authed(self.client.get(url), session)).await?;
        Ok(response.json().await?)
    }

    async fn get_contacts(&self, session: &Session, username: &str) -> Result<Vec<Contact>> {
        let url = format!("{}/{}", self.contacts_uri, username);
        let response = self.send(self.authed(self.client.get(url), session)).await?;
        Ok(response.json().await?)
    }

    async fn add_contact(&self, session: &Session, username: &str, contact: &Contact) -> Result<()> {
        debug!("Adding new contact");
        let url = format!("{}/{}", self.contacts_uri, username);
        let request = self.authed(self.client.post(url).json(contact), session);
        self.send(request).await?;
        Ok(())
    }
}

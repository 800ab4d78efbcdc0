//! Bankfront Core - form validation and request plumbing for the bank web frontend
//!
//! This crate follows a hexagonal architecture:
//!
//! - **domain**: Forms, validation rules, modal controllers, tokens, money
//! - **ports**: Trait definitions for external dependencies (BankBackend)
//! - **services**: Login, signup, payment, deposit and home page flows
//! - **adapters**: Concrete implementations (HTTP backend, demo bank, axum web layer)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use adapters::demo::DemoBackend;
use adapters::http::HttpBackend;
use config::Config;
use domain::RoutingNumber;
use ports::BankBackend;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{FormKind, FormState, IdempotencyToken, Session};

/// Main context for frontend operations
///
/// Holds the configuration, the backend and every service. Shared by all
/// request handlers behind an `Arc`.
pub struct FrontendContext {
    pub config: Config,
    pub backend: Arc<dyn BankBackend>,
    pub verifier: Arc<TokenVerifier>,
    pub auth_service: AuthService,
    pub payment_service: PaymentService,
    pub deposit_service: DepositService,
    pub home_service: HomeService,
    pub validation_service: ValidationService,
    pub event_log: Option<Arc<EventLogService>>,
}

impl FrontendContext {
    /// Wire services around an existing backend and verifier
    pub fn new(config: Config, backend: Arc<dyn BankBackend>, verifier: Arc<TokenVerifier>) -> Result<Self> {
        let local_routing = RoutingNumber::parse(&config.local_routing)
            .with_context(|| format!("LOCAL_ROUTING_NUM {:?} is not a routing number", config.local_routing))?;

        Ok(Self {
            auth_service: AuthService::new(Arc::clone(&backend), Arc::clone(&verifier)),
            payment_service: PaymentService::new(Arc::clone(&backend), local_routing.clone()),
            deposit_service: DepositService::new(Arc::clone(&backend), local_routing),
            home_service: HomeService::new(Arc::clone(&backend)),
            validation_service: ValidationService::new(),
            event_log: None,
            config,
            backend,
            verifier,
        })
    }

    /// Talk to the real backend services, verifying tokens with PUB_KEY_PATH
    pub fn connect(config: Config) -> Result<Self> {
        let pem = config.read_public_key()?;
        let verifier = Arc::new(TokenVerifier::from_rsa_pem(&pem)?);
        let backend: Arc<dyn BankBackend> = Arc::new(HttpBackend::new(&config)?);
        info!("Using backend services at {}", config.transactions_uri);
        Self::new(config, backend, verifier)
    }

    /// Serve from an in-memory demo bank with a per-process signing secret
    pub fn demo(config: Config) -> Result<Self> {
        let secret: [u8; 32] = rand::random();
        let backend: Arc<dyn BankBackend> = Arc::new(DemoBackend::new(&secret, config.local_routing.clone())?);
        let verifier = Arc::new(TokenVerifier::from_secret(&secret));
        info!("Using in-memory demo bank");
        Self::new(config, backend, verifier)
    }

    /// Record events to `events.duckdb` in `dir`
    pub fn with_event_log(mut self, dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        let log = EventLogService::new(dir, entry_point, self.config.version.clone(), self.config.platform)?;
        self.event_log = Some(Arc::new(log));
        Ok(self)
    }
}

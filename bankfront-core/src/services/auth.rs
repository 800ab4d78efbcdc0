//! Session tokens and the login/signup flows

use std::sync::Arc;

use chrono::NaiveDate;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::{debug, error, info};

use crate::domain::form::{PASSWORD, USERNAME};
use crate::domain::result::{Error, Result};
use crate::domain::{Claims, FormKind, FormState, Session};
use crate::ports::BankBackend;
use crate::services::ValidationService;

/// Verifies session JWTs issued by the user service
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// RS256 with the user service's public key
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self> {
        let key = DecodingKey::from_rsa_pem(pem)
            .map_err(|e| Error::config(format!("invalid public key: {}", e)))?;
        Ok(Self {
            key,
            validation: Validation::new(Algorithm::RS256),
        })
    }

    /// HS256 with a shared secret, used by the demo bank
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Check signature and expiry
    pub fn verify(&self, token: &str) -> Result<Session> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| Error::InvalidToken(e.to_string()))?;
        debug!("Verified session token");
        Ok(Session {
            token: token.to_string(),
            claims: data.claims,
        })
    }

    /// Verify a cookie value if there is one; any failure means "no session"
    pub fn session(&self, token: Option<&str>) -> Option<Session> {
        let token = token.filter(|t| !t.is_empty())?;
        match self.verify(token) {
            Ok(session) => Some(session),
            Err(e) => {
                debug!("Rejecting session token: {}", e);
                None
            }
        }
    }
}

/// Read a token's claims without checking its signature or expiry
pub fn decode_unverified(token: &str) -> Result<Claims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| Error::InvalidToken(e.to_string()))
}

/// Login and signup against the user service
pub struct AuthService {
    backend: Arc<dyn BankBackend>,
    verifier: Arc<TokenVerifier>,
    validation: ValidationService,
}

impl AuthService {
    pub fn new(backend: Arc<dyn BankBackend>, verifier: Arc<TokenVerifier>) -> Self {
        Self {
            backend,
            verifier,
            validation: ValidationService::new(),
        }
    }

    /// Exchange credentials for a verified session
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        debug!("Logging in");
        let form = FormState::new().with(USERNAME, username).with(PASSWORD, password);
        let today = chrono::Utc::now().date_naive();
        self.validation.check(FormKind::Login, &form, today)?;

        let token = self.backend.login(username, password).await.map_err(|e| {
            error!("Error logging in: {}", e);
            e
        })?;
        let session = self.verifier.verify(&token)?;
        info!("Successfully logged in");
        Ok(session)
    }

    /// Create the account, then log in as the new user
    pub async fn signup(&self, form: &FormState, today: NaiveDate) -> Result<Session> {
        debug!("Creating new user");
        self.validation.check(FormKind::Signup, form, today)?;

        self.backend.create_user(form).await.map_err(|e| {
            error!("Error creating new user: {}", e);
            e
        })?;
        info!("New user created");
        self.login(form.get(USERNAME), form.get(PASSWORD)).await
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use utoipa::ToSchema;

use crate::models::Identity;

/// Failure kinds reported by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AuthErrorKind {
    InvalidCredential,
    TooManyRequests,
    UserNotFound,
    InvalidEmail,
    WeakPassword,
    EmailAlreadyInUse,
    ExpiredActionCode,
    InvalidActionCode,
    NetworkRequestFailed,
    UserDisabled,
    Unknown,
}

// Provider codes in both the SDK (`auth/...`) and REST (`UPPER_SNAKE`) spellings.
const PROVIDER_CODES: &[(&str, AuthErrorKind)] = &[
    ("auth/invalid-credential", AuthErrorKind::InvalidCredential),
    ("auth/wrong-password", AuthErrorKind::InvalidCredential),
    ("INVALID_LOGIN_CREDENTIALS", AuthErrorKind::InvalidCredential),
    ("INVALID_PASSWORD", AuthErrorKind::InvalidCredential),
    ("auth/too-many-requests", AuthErrorKind::TooManyRequests),
    ("TOO_MANY_ATTEMPTS_TRY_LATER", AuthErrorKind::TooManyRequests),
    ("auth/user-not-found", AuthErrorKind::UserNotFound),
    ("EMAIL_NOT_FOUND", AuthErrorKind::UserNotFound),
    ("auth/invalid-email", AuthErrorKind::InvalidEmail),
    ("INVALID_EMAIL", AuthErrorKind::InvalidEmail),
    ("MISSING_EMAIL", AuthErrorKind::InvalidEmail),
    ("auth/weak-password", AuthErrorKind::WeakPassword),
    ("WEAK_PASSWORD", AuthErrorKind::WeakPassword),
    ("auth/email-already-in-use", AuthErrorKind::EmailAlreadyInUse),
    ("EMAIL_EXISTS", AuthErrorKind::EmailAlreadyInUse),
    ("auth/expired-action-code", AuthErrorKind::ExpiredActionCode),
    ("EXPIRED_OOB_CODE", AuthErrorKind::ExpiredActionCode),
    ("auth/invalid-action-code", AuthErrorKind::InvalidActionCode),
    ("INVALID_OOB_CODE", AuthErrorKind::InvalidActionCode),
    ("auth/network-request-failed", AuthErrorKind::NetworkRequestFailed),
    ("auth/user-disabled", AuthErrorKind::UserDisabled),
    ("USER_DISABLED", AuthErrorKind::UserDisabled),
];

impl AuthErrorKind {
    pub fn from_provider_code(code: &str) -> Self {
        let code = code.trim();
        PROVIDER_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, kind)| *kind)
            .unwrap_or(AuthErrorKind::Unknown)
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthErrorKind::InvalidCredential => "invalid-credential",
            AuthErrorKind::TooManyRequests => "too-many-requests",
            AuthErrorKind::UserNotFound => "user-not-found",
            AuthErrorKind::InvalidEmail => "invalid-email",
            AuthErrorKind::WeakPassword => "weak-password",
            AuthErrorKind::EmailAlreadyInUse => "email-already-in-use",
            AuthErrorKind::ExpiredActionCode => "expired-action-code",
            AuthErrorKind::InvalidActionCode => "invalid-action-code",
            AuthErrorKind::NetworkRequestFailed => "network-request-failed",
            AuthErrorKind::UserDisabled => "user-disabled",
            AuthErrorKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{}: {detail}", .kind.code())]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub detail: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    /// REST error messages look like `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub fn from_provider_message(message: &str) -> Self {
        let code = message.split(" : ").next().unwrap_or(message);
        Self::new(AuthErrorKind::from_provider_code(code), message)
    }
}

/// The form a failure came from; each has its own message set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    SignIn,
    SignUp,
    SendPasswordReset,
    ConfirmPasswordReset,
}

const MESSAGES: &[(AuthAction, AuthErrorKind, &str)] = &[
    (AuthAction::SignIn, AuthErrorKind::InvalidCredential, "Incorrect email address or password."),
    (AuthAction::SignIn, AuthErrorKind::TooManyRequests, "Too many sign-in attempts. Please wait a while and try again."),
    (AuthAction::SignUp, AuthErrorKind::EmailAlreadyInUse, "This email address is already in use."),
    (AuthAction::SignUp, AuthErrorKind::WeakPassword, "Password must be at least 6 characters."),
    (AuthAction::SignUp, AuthErrorKind::InvalidEmail, "Please enter a valid email address."),
    (AuthAction::SendPasswordReset, AuthErrorKind::UserNotFound, "No account is registered for that email address."),
    (AuthAction::SendPasswordReset, AuthErrorKind::InvalidEmail, "Please enter a valid email address."),
    (AuthAction::SendPasswordReset, AuthErrorKind::TooManyRequests, "Too many requests. Please wait a while and try again."),
    (AuthAction::SendPasswordReset, AuthErrorKind::NetworkRequestFailed, "A network error occurred. Please check your internet connection."),
    (AuthAction::ConfirmPasswordReset, AuthErrorKind::ExpiredActionCode, "This reset link has expired. Please request a new reset email."),
    (AuthAction::ConfirmPasswordReset, AuthErrorKind::InvalidActionCode, "This reset link is invalid."),
    (AuthAction::ConfirmPasswordReset, AuthErrorKind::WeakPassword, "Password is too weak. Please choose a stronger password."),
    (AuthAction::ConfirmPasswordReset, AuthErrorKind::TooManyRequests, "Too many requests. Please wait a while and try again."),
];

/// User-facing message for `err` raised while performing `action`.
pub fn user_message(action: AuthAction, err: &AuthError) -> String {
    if let Some((_, _, msg)) = MESSAGES.iter().find(|(a, k, _)| *a == action && *k == err.kind) {
        return (*msg).to_string();
    }
    match action {
        AuthAction::SignIn => "Sign-in failed. Please check your email address and password.".into(),
        AuthAction::SignUp => "Account creation failed.".into(),
        AuthAction::SendPasswordReset => format!("Failed to send the password reset email. Error: {}", err.detail),
        AuthAction::ConfirmPasswordReset => "Failed to change the password. Please try again later.".into(),
    }
}

/// Hosted authentication service. Every implementation publishes sign-in and
/// sign-out through the channel handed out by `subscribe`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    async fn send_password_reset(&self, email: &str, continue_url: Option<&str>) -> Result<(), AuthError>;
    async fn confirm_password_reset(&self, oob_code: &str, new_password: &str) -> Result<(), AuthError>;
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

// ---------------- Hosted REST implementation ----------------
pub struct RestIdentityProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    state: watch::Sender<Option<Identity>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl RestIdentityProvider {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            state,
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T, AuthError> {
        let url = format!("{}/accounts:{}?key={}", self.endpoint, method, urlencoding::encode(&self.api_key));
        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::new(AuthErrorKind::NetworkRequestFailed, e.to_string()))?;
        if resp.status().is_success() {
            return resp
                .json::<T>()
                .await
                .map_err(|e| AuthError::new(AuthErrorKind::Unknown, e.to_string()));
        }
        let status = resp.status();
        match resp.json::<ErrorEnvelope>().await {
            Ok(env) => Err(AuthError::from_provider_message(&env.error.message)),
            Err(e) => Err(AuthError::new(AuthErrorKind::Unknown, format!("{status}: {e}"))),
        }
    }

    fn establish(&self, acc: AccountResponse) -> Identity {
        let identity = Identity { email: acc.email, uid: acc.local_id };
        self.state.send_replace(Some(identity.clone()));
        identity
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let acc: AccountResponse = self
            .call("signUp", serde_json::json!({ "email": email, "password": password, "returnSecureToken": true }))
            .await?;
        Ok(self.establish(acc))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let acc: AccountResponse = self
            .call("signInWithPassword", serde_json::json!({ "email": email, "password": password, "returnSecureToken": true }))
            .await?;
        Ok(self.establish(acc))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // tokens live only in this process; dropping the state is the sign-out
        self.state.send_replace(None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, continue_url: Option<&str>) -> Result<(), AuthError> {
        let mut body = serde_json::json!({ "requestType": "PASSWORD_RESET", "email": email });
        if let Some(url) = continue_url {
            body["continueUrl"] = serde_json::Value::String(url.to_string());
        }
        let _: serde_json::Value = self.call("sendOobCode", body).await?;
        Ok(())
    }

    async fn confirm_password_reset(&self, oob_code: &str, new_password: &str) -> Result<(), AuthError> {
        let _: serde_json::Value = self
            .call("resetPassword", serde_json::json!({ "oobCode": oob_code, "newPassword": new_password }))
            .await?;
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }
}

// ---------------- In-process implementation (development / tests) ----------------
pub mod inmem {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use sha2::{Digest, Sha256};
    use std::collections::HashMap;
    use std::sync::Mutex;

    const MIN_PASSWORD_LEN: usize = 6;

    struct Account {
        uid: String,
        email: String,
        password_hash: String,
    }

    struct ResetCode {
        email: String,
        expires_at: DateTime<Utc>,
    }

    /// A reset email that would have been delivered.
    #[derive(Debug, Clone)]
    pub struct SentResetEmail {
        pub email: String,
        pub oob_code: String,
        pub continue_url: Option<String>,
    }

    #[derive(Default)]
    struct Inner {
        accounts: HashMap<String, Account>, // keyed by lowercase email
        reset_codes: HashMap<String, ResetCode>,
        outbox: Vec<SentResetEmail>,
    }

    pub struct InMemIdentityProvider {
        inner: Mutex<Inner>,
        reset_ttl: Duration,
        state: watch::Sender<Option<Identity>>,
    }

    fn hash_password(uid: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(uid.as_bytes());
        hasher.update(b":");
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn looks_like_email(email: &str) -> bool {
        match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
            None => false,
        }
    }

    impl InMemIdentityProvider {
        pub fn new() -> Self {
            Self::with_reset_ttl(Duration::hours(1))
        }

        pub fn with_reset_ttl(reset_ttl: Duration) -> Self {
            let (state, _) = watch::channel(None);
            Self { inner: Mutex::new(Inner::default()), reset_ttl, state }
        }

        fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, AuthError> {
            self.inner
                .lock()
                .map_err(|_| AuthError::new(AuthErrorKind::Unknown, "identity state poisoned"))
        }

        /// Reset emails issued so far, oldest first.
        pub fn sent_reset_emails(&self) -> Vec<SentResetEmail> {
            self.lock().map(|i| i.outbox.clone()).unwrap_or_default()
        }

        pub fn latest_reset_code(&self, email: &str) -> Option<String> {
            let email = email.trim().to_lowercase();
            self.sent_reset_emails()
                .into_iter()
                .rev()
                .find(|m| m.email == email)
                .map(|m| m.oob_code)
        }
    }

    impl Default for InMemIdentityProvider {
        fn default() -> Self { Self::new() }
    }

    #[async_trait]
    impl IdentityProvider for InMemIdentityProvider {
        async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
            let key = email.trim().to_lowercase();
            if !looks_like_email(&key) {
                return Err(AuthError::new(AuthErrorKind::InvalidEmail, email));
            }
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(AuthError::new(AuthErrorKind::WeakPassword, "password shorter than 6 characters"));
            }
            let identity = {
                let mut inner = self.lock()?;
                if inner.accounts.contains_key(&key) {
                    return Err(AuthError::new(AuthErrorKind::EmailAlreadyInUse, key));
                }
                let uid = uuid::Uuid::new_v4().simple().to_string();
                let account = Account { password_hash: hash_password(&uid, password), uid: uid.clone(), email: key.clone() };
                inner.accounts.insert(key.clone(), account);
                Identity { email: Some(key), uid }
            };
            log::info!("created local account uid={}", identity.uid);
            self.state.send_replace(Some(identity.clone()));
            Ok(identity)
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
            let key = email.trim().to_lowercase();
            let identity = {
                let inner = self.lock()?;
                let account = inner
                    .accounts
                    .get(&key)
                    .filter(|a| a.password_hash == hash_password(&a.uid, password))
                    .ok_or_else(|| AuthError::new(AuthErrorKind::InvalidCredential, "email or password mismatch"))?;
                Identity { email: Some(account.email.clone()), uid: account.uid.clone() }
            };
            self.state.send_replace(Some(identity.clone()));
            Ok(identity)
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            self.state.send_replace(None);
            Ok(())
        }

        async fn send_password_reset(&self, email: &str, continue_url: Option<&str>) -> Result<(), AuthError> {
            let key = email.trim().to_lowercase();
            if !looks_like_email(&key) {
                return Err(AuthError::new(AuthErrorKind::InvalidEmail, email));
            }
            let mut inner = self.lock()?;
            if !inner.accounts.contains_key(&key) {
                return Err(AuthError::new(AuthErrorKind::UserNotFound, key));
            }
            let oob_code = uuid::Uuid::new_v4().simple().to_string();
            inner.reset_codes.insert(
                oob_code.clone(),
                ResetCode { email: key.clone(), expires_at: Utc::now() + self.reset_ttl },
            );
            inner.outbox.push(SentResetEmail {
                email: key,
                oob_code,
                continue_url: continue_url.map(str::to_string),
            });
            Ok(())
        }

        async fn confirm_password_reset(&self, oob_code: &str, new_password: &str) -> Result<(), AuthError> {
            let mut inner = self.lock()?;
            let code = inner
                .reset_codes
                .remove(oob_code)
                .ok_or_else(|| AuthError::new(AuthErrorKind::InvalidActionCode, "unknown or used code"))?;
            if code.expires_at <= Utc::now() {
                return Err(AuthError::new(AuthErrorKind::ExpiredActionCode, "code expired"));
            }
            if new_password.chars().count() < MIN_PASSWORD_LEN {
                // code stays usable for another attempt
                inner.reset_codes.insert(oob_code.to_string(), code);
                return Err(AuthError::new(AuthErrorKind::WeakPassword, "password shorter than 6 characters"));
            }
            let account = inner
                .accounts
                .get_mut(&code.email)
                .ok_or_else(|| AuthError::new(AuthErrorKind::UserNotFound, code.email.clone()))?;
            account.password_hash = hash_password(&account.uid, new_password);
            Ok(())
        }

        fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
            self.state.subscribe()
        }
    }
}

// Bearer token lifecycle: expiry check, reuse, reacquisition
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::modules::storage::{LocalStore, TOKEN_KEY};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Decode the claims segment of a JWT-shaped token
pub fn token_claims(token: &str) -> Option<Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_LENIENT
        .decode(payload)
        .or_else(|_| STANDARD_LENIENT.decode(payload))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Numeric value of a claim, coerced the way a browser multiplies it.
/// Absent or non-numeric values give NaN.
fn claim_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Array(items)) => match items.as_slice() {
            [] => 0.0,
            [single] => claim_number(Some(single)),
            _ => f64::NAN,
        },
        Some(Value::Object(_)) => f64::NAN,
    }
}

/// The `exp` claim in seconds since epoch, when it coerces to a number
pub fn token_expiry(token: &str) -> Option<f64> {
    let claims = token_claims(token)?;
    let exp = claim_number(claims.get("exp"));
    (!exp.is_nan()).then_some(exp)
}

/// Expired when `exp` is in the past at `now_ms`.
///
/// An undecodable token (no claims segment, bad base64, non-JSON or a null
/// payload) is expired. Decodable claims without a numeric `exp` never
/// compare as past, so such a token stays usable.
pub fn is_token_expired_at(token: &str, now_ms: i64) -> bool {
    match token_claims(token) {
        None | Some(Value::Null) => true,
        Some(claims) => claim_number(claims.get("exp")) * 1000.0 < now_ms as f64,
    }
}

pub fn is_token_expired(token: &str) -> bool {
    is_token_expired_at(token, chrono::Utc::now().timestamp_millis())
}

/// Holds the current bearer token, mirrored into local storage
pub struct TokenStore {
    store: Arc<LocalStore>,
    current: RwLock<Option<String>>,
}

impl TokenStore {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// Reuse the stored token while it is valid, otherwise log in once.
    ///
    /// A stale stored token is removed before the login attempt. A failed
    /// login surfaces as `AppError::Auth`.
    pub async fn ensure_token<F, Fut>(&self, login: F) -> AppResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<String>>,
    {
        if let Some(stored) = self.store.get(TOKEN_KEY) {
            if !is_token_expired(&stored) {
                tracing::debug!("[auth] reusing stored token");
                *self.current.write().await = Some(stored.clone());
                return Ok(stored);
            }
            tracing::info!("[auth] stored token expired, discarding");
            self.store.remove(TOKEN_KEY)?;
        }

        *self.current.write().await = None;

        let token = login().await.map_err(|e| match e {
            AppError::Auth(msg) => AppError::Auth(msg),
            other => AppError::Auth(other.to_string()),
        })?;

        self.store.set(TOKEN_KEY, token.clone())?;
        *self.current.write().await = Some(token.clone());
        Ok(token)
    }

    /// Drop the persisted token after the backend rejected it.
    ///
    /// The in-memory token stays so the conversation keeps working until
    /// the user reloads; the next `ensure_token` then logs in again.
    pub fn discard_stored(&self) -> AppResult<()> {
        self.store.remove(TOKEN_KEY)
    }
}

//! Signed remember-me cookies.
//!
//! Cookie value: `base64(username:expiry:signature)` where `expiry` is unix
//! milliseconds and `signature = sha256_hex(username:expiry:password:key)`.
//! Changing the password or the key invalidates every issued cookie.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use crate::authentication::{Authentication, AuthenticationKind, UserDetails, UserDetailsService};
use crate::properties::RememberMeProperties;

#[derive(Debug, Clone)]
pub struct RememberMeServices {
    key: String,
    validity: Duration,
    parameter: String,
    cookie_name: String,
    always_remember: bool,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn signature(username: &str, expiry: u128, password: &str, key: &str) -> String {
    hex::encode(Sha256::digest(
        format!("{username}:{expiry}:{password}:{key}").as_bytes(),
    ))
}

impl RememberMeServices {
    #[must_use]
    pub fn new(key: impl Into<String>, props: &RememberMeProperties) -> Self {
        Self {
            key: key.into(),
            validity: Duration::from_secs(props.validity_seconds),
            parameter: props.parameter.clone(),
            cookie_name: props.cookie_name.clone(),
            always_remember: props.always_remember,
        }
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    #[must_use]
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Whether a login request asked for a cookie.
    #[must_use]
    pub fn requested(&self, value: Option<&str>) -> bool {
        self.always_remember
            || value.is_some_and(|v| {
                matches!(v.to_ascii_lowercase().as_str(), "true" | "on" | "yes" | "1")
            })
    }

    #[must_use]
    pub fn encode_cookie(&self, user: &UserDetails) -> String {
        self.encode_cookie_at(user, now_millis())
    }

    fn encode_cookie_at(&self, user: &UserDetails, now: u128) -> String {
        let expiry = now + self.validity.as_millis();
        let sig = signature(&user.username, expiry, &user.password, &self.key);
        STANDARD.encode(format!("{}:{expiry}:{sig}", user.username))
    }

    /// Authenticate from a cookie value. `None` for malformed, expired,
    /// forged or orphaned cookies.
    pub async fn auto_login(
        &self,
        cookie: &str,
        users: &dyn UserDetailsService,
    ) -> Option<Authentication> {
        self.auto_login_at(cookie, users, now_millis()).await
    }

    async fn auto_login_at(
        &self,
        cookie: &str,
        users: &dyn UserDetailsService,
        now: u128,
    ) -> Option<Authentication> {
        let decoded = STANDARD.decode(cookie).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let mut parts = decoded.rsplitn(3, ':');
        let sig = parts.next()?;
        let expiry: u128 = parts.next()?.parse().ok()?;
        let username = parts.next()?;

        if expiry < now {
            tracing::debug!(username, "remember-me cookie expired");
            return None;
        }
        let user = users.load_user(username).await.ok()??;
        if !user.enabled || signature(username, expiry, &user.password, &self.key) != sig {
            tracing::warn!(username, "remember-me cookie rejected");
            return None;
        }
        Some(Authentication::from_user(&user, AuthenticationKind::RememberMe))
    }
}

//! Data every full page needs: the CSP nonce, the signed-in user, the cart
//! badge and any pending flash message.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;

use crate::middleware::CspNonce;
use crate::middleware::auth::request_uri;
use crate::models::{Cart, CurrentUser, Flash, session_keys};
use crate::state::AppState;

/// Shared layout data, passed to every page template as `ctx`.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub nonce: String,
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub flash: Option<Flash>,
    /// Request path, for highlighting the active nav link.
    pub path: String,
    pub vapid_public_key: Option<String>,
}

impl PageContext {
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }

    /// Whether the nav link for `prefix` should render as active.
    #[must_use]
    pub fn nav_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            self.path == "/"
        } else {
            self.path.starts_with(prefix)
        }
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CspNonce(nonce) = CspNonce::from_request_parts(parts, state).await?;
        let mut ctx = Self {
            nonce,
            path: request_uri(parts).path().to_string(),
            vapid_public_key: state.config().vapid_public_key.clone(),
            ..Self::default()
        };

        if let Some(session) = parts.extensions.get::<Session>() {
            ctx.user = session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten();
            ctx.cart_count = load_cart(session).await.item_count();
            ctx.flash = take_flash(session).await;
        }

        Ok(ctx)
    }
}

/// The session cart, empty when none is stored or it fails to decode.
pub async fn load_cart(session: &Session) -> Cart {
    match session.get::<Cart>(session_keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Failed to read cart from session: {e}");
            Cart::default()
        }
    }
}

/// Persist the cart; an empty cart is removed from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    if cart.is_empty() {
        session.remove::<Cart>(session_keys::CART).await?;
        Ok(())
    } else {
        session.insert(session_keys::CART, cart).await
    }
}

/// Queue a message for the next rendered page.
pub async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(session_keys::FLASH, flash).await {
        tracing::warn!("Failed to store flash message: {e}");
    }
}

async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_active() {
        let ctx = PageContext {
            path: "/shop/obd-scanner".to_string(),
            ..PageContext::default()
        };
        assert!(ctx.nav_active("/shop"));
        assert!(!ctx.nav_active("/"));
        assert!(!ctx.nav_active("/blog"));

        let home = PageContext {
            path: "/".to_string(),
            ..PageContext::default()
        };
        assert!(home.nav_active("/"));
    }

    #[test]
    fn test_anonymous_context() {
        let ctx = PageContext::default();
        assert!(!ctx.is_signed_in());
        assert!(!ctx.is_admin());
    }
}

//! Session-held models: the signed-in user, the cart and flash messages.

pub mod cart;
pub mod session;

pub use cart::{Cart, CartError, CartItem, PendingOrder};
pub use session::{CurrentUser, Flash, FlashKind, keys as session_keys};

//! Authentication state trait.

use crate::jwt::TokenKeys;

/// Trait for state types that expose the token keys, so the auth
/// extractor works against any router state.
pub trait HasAuthState {
    fn keys(&self) -> &TokenKeys;
}

//! Bearer-token authentication for API endpoints.

mod errors;
mod extractors;
mod state;

pub use errors::AuthError;
pub use extractors::{ApiAuth, AuthenticatedUser, bearer_token};
pub use state::HasAuthState;

//! Authentication: credential storage, the session context that owns it,
//! and the local form checks that gate auth requests.

pub mod session;
pub mod store;
pub mod validation;

pub use session::{AuthSession, AuthToken, SessionState};
pub use validation::{LoginForm, RegistrationForm, ValidationError};

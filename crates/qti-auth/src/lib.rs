//! Authentication for QTI API clients.
//!
//! This crate provides:
//! - The persisted credential model and its authentication-method variants
//! - The `AuthProvider` capability and its Firebase implementation
//! - `CredentialStore`, an in-memory credential cache written through to a
//!   `KeyValueStore`

mod credentials;
mod error;
mod firebase;
mod provider;
mod store;

pub use credentials::{
    AuthTokens, AuthenticationMethod, Credentials, SessionContext, SignIn, UserInfo,
};
pub use error::{AuthError, AuthResult};
pub use firebase::{summarize_response_body, FirebaseAuthProvider, FirebaseEndpoints};
pub use provider::AuthProvider;
pub use store::CredentialStore;

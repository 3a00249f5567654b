//! API clients for QTI test delivery.
//!
//! Three clients share the authenticated pipeline from `qti-http`:
//! - [`TeacherClient`]: assessments, deliveries, student sessions and results
//! - [`ToolsClient`]: package upload and assessment settings
//! - [`StudentClient`]: code-based sign-in, test context and session state
//!
//! Each keeps its credentials under its own storage namespace, so the three
//! can share one [`qti_storage::KeyValueStore`].

mod account;
mod error;
pub mod models;
mod options;
mod student;
mod teacher;
mod tools;

pub use account::AccountSession;
pub use error::{ClientError, ClientResult};
pub use options::ClientOptions;
pub use student::{date_id, StudentClient, StudentReauthenticator};
pub use teacher::TeacherClient;
pub use tools::ToolsClient;

#[cfg(test)]
mod tests;

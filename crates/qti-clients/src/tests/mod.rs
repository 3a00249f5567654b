//! Client tests against a routed mock backend.
//!
//! Organized by client:
//! - teacher: endpoint shapes, access checks, account lookups
//! - tools: uploads and package management
//! - student: sign-in flows and re-binding after a refresh

mod teacher;

//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **memory**: the in-process posting store
//! - **gemini**: the reqwest-backed match model
//! - **seed_file**: JSON posting seeds read through cap-std
//!
//! Adapters are thin translators between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod gemini;
pub mod memory;
pub mod seed_file;

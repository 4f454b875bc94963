//! Library surface of the dashboard client, shared by the binary and integration tests.

pub mod api;
pub mod app;
pub mod error;
pub mod history;
pub mod logging;
pub mod profiles;
pub mod reconcile;
pub mod session;
pub mod tls;
pub mod types;
pub mod ui;
pub mod ws;

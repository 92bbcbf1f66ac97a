pub mod api;
pub mod auth_middleware;
pub mod balance;
pub mod chat;
pub mod clock;
pub mod command;
pub mod config;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod intent_validation;
pub mod metrics;
pub mod model;
pub mod notifier;
pub mod orchestrator;
pub mod pairs;
pub mod reply;
pub mod signer;
pub mod webhook;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

#[cfg(test)]
mod tests;

//! Inquiry intake: external customer form backed by a customer directory,
//! inquiry storage and notification mail.

pub mod app;
pub mod config;
pub mod error;
pub mod intake;
pub mod mail;
pub mod store;

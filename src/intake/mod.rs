//! Inquiry intake: form rendering and the submission workflow.

pub mod form;
pub mod model;
pub mod notifier;
pub mod resolver;
pub mod routes;
pub mod service;
pub mod writer;

pub use model::{CustomerMatch, IntakeReceipt, NotificationReport, Submission};
pub use routes::intake_routes;
pub use service::IntakeService;

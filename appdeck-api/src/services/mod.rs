//! Service Layer
//!
//! Business logic shared by route handlers: operator accounts and the
//! audit trail. Handlers stay thin and deal only in request and response
//! shapes.

mod accounts;
mod audit;

pub use accounts::{AccountService, LoginOutcome, Registration};
pub use audit::{AuditEntry, AuditRecorder};

//! Core domain for resumebot - a webhook-driven resume review bot.
//!
//! This crate is interface-free: it holds the configuration loader, the error
//! taxonomy, the persistent domain records, and the input validators. The
//! Discord wire format lives in `resumebot-discord`, persistence in
//! `resumebot-db`, and the HTTP surface in `resumebot-server`.

pub mod config;
pub mod domain;
pub mod errors;
pub mod validate;

pub use domain::review::{
    AttachmentMeta, CommitOutcome, NewReviewRequest, ReviewRequest, ReviewRequestId, ReviewStatus,
};
pub use domain::user::{User, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use validate::{validate_email, validate_resume_attachment};

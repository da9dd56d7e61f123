//! Discord integration - webhook interaction handling
//!
//! This crate provides the Discord interface for resumebot:
//! - **Interactions** (`interactions`) - wire payload parsing into typed events
//! - **Dispatcher** (`dispatcher`) - the command/modal state machine
//! - **Responses** (`responses`) - interaction callbacks (ephemeral messages, modals)
//! - **Pending cache** (`pending`) - attachment metadata held between command and modal
//! - **Notify** (`notify`) - best-effort operational notification seam
//!
//! # Architecture
//!
//! ```text
//! Signed webhook POST → parse_interaction → InteractionDispatcher → ReviewStore
//!                                                ↓
//!                                  InteractionResponse ← Responses
//! ```
//!
//! The dispatcher never talks HTTP or SQL: signature verification and the
//! sqlite-backed store are injected by `resumebot-server`.

pub mod dispatcher;
pub mod interactions;
pub mod notify;
pub mod pending;
pub mod responses;

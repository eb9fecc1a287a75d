//! Scoring API contract for the salary coherence front-end.
//!
//! SYSTEM CONTEXT
//! ==============
//! The score itself is computed remotely. This crate covers everything on
//! this side of the wire:
//! - [`types`]: request/response bodies.
//! - [`client`]: public and admin endpoints, plus a cancellable loader.
//! - [`validation`]: form schemas, checked before anything is sent.
//! - [`report`]: the render-ready score view and its formatting helpers.
//! - [`export`]: admin table ordering and CSV export.

pub mod client;
pub mod error;
pub mod export;
pub mod report;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use client::{AdminAccess, BearerAccess, ScoreLoader, ScoresClient};
pub use error::{ScoresError, ValidationError};
pub use export::{SortDirection, SortField, TableSort};
pub use report::{ScoreView, StatCard};
pub use types::{AnalyzeResponse, EmailMatch, Score, ScoreInput, ScoreOutput, ScoreRecord, Stats};
pub use validation::{LoginForm, ScoreForm};

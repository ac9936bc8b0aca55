//! Workflow/inspection engine for construction-quality tracking along
//! road-building projects.
//!
//! The engine is pure and synchronous: every function takes an immutable
//! snapshot of phase/workflow/inspection data and returns derived values
//! with no side effects or hidden state. Fetching records, persisting
//! submissions and serializing concurrent writers are the calling
//! layer's responsibility; the side-booking output is advice, not a
//! mutex.

pub mod booking;
pub mod overlay;
pub mod progress;
pub mod propagation;
pub mod segments;
pub mod selection;
pub mod snapshots;
pub mod submission;
pub mod workflow;

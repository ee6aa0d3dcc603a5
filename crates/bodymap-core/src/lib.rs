//! # bodymap-core
//!
//! Domain model and editing engine for Body Assignments: a four-level
//! emotional-mapping tree of main colors, sub-feelings and final options.
//!
//! All mutation goes through [`AssignmentManager`], which validates the
//! whole aggregate before handing it to an [`AssignmentStore`].

pub mod constants;
pub mod error;
pub mod input;
pub mod manager;
pub mod model;
pub mod preview;
pub mod store;
pub mod types;
pub mod validation;

pub use error::{AssignmentError, Result};
pub use manager::{AssignmentManager, AssignmentSummary};
pub use model::*;
pub use store::{AssignmentQuery, AssignmentStore, MemoryStore, SortField, SortOrder};
pub use types::{AdminRef, AssignmentId, NodeId, NodeLevel};

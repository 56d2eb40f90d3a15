//! Shared data structures for the well-log harmonisation pipeline
//!
//! - Reference-table records keyed by [`WellId`] (wells, log runs, formation tops)
//! - The LAS document model ([`LasDocument`], [`Curve`], [`HeaderSection`])
//! - Derived [`FormationInterval`]s and the merge address [`OutputKey`]

mod formation;
mod las;
mod well;

pub use formation::*;
pub use las::*;
pub use well::*;

//! Hit results for spanq.
//!
//! This crate turns occurrence streams into hit sequences and everything derived
//! from them:
//!
//! - [`HitResults`]: a lazily materialized hit sequence with processing and
//!   counting caps, plus the window, sample, sort and filter derivations
//! - [`ResultsStats`], [`MaxStats`] and [`WindowStats`]: plain progress snapshots
//! - [`HitProperty`] and [`PropertyValue`]: what hits are sorted and grouped by
//! - [`DocResults`], [`HitGroups`] and [`Collocations`]: aggregations

#![warn(missing_docs)]

mod collocations;
mod docs;
mod error;
mod groups;
mod hit;
mod hits;
mod property;
mod sample;
mod stats;

pub use collocations::{Collocation, Collocations};
pub use docs::{DocResult, DocResults};
pub use error::ResultsError;
pub use groups::{HitGroup, HitGroups};
pub use hit::{CapturedGroups, GroupMap, Hit};
pub use hits::{HitLimits, HitResults};
pub use property::{DEFAULT_CONTEXT_SIZE, HitProperty, PropertyValue, TermsValue};
pub use sample::{SampleAmount, SampleParameters};
pub use stats::{MaxStats, ResultsStats, WindowStats};

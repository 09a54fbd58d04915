//! Channel classification and naming
//!
//! Maps a `(region, display name)` pair onto a ranked [`Group`](crate::models::Group)
//! and collapses spelling variants of the flagship channel family.

pub mod classifier;
pub mod group_table;
pub mod normalizer;

pub use classifier::{Classifier, Matcher, Rule};
pub use group_table::{GroupTable, UNKNOWN_GROUP_RANK};
pub use normalizer::NameNormalizer;

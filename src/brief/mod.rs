//! Brief assembly and the day-keyed store.

pub mod assemble;
pub mod store;

pub use assemble::{AssembleBrief, BriefAssembler};
pub use store::BriefStore;

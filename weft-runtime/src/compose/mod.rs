//! Composition operators: building primitives out of primitives.
//!
//! Each operator holds already-instrumented children and passes its own
//! context straight to them, so every child's instrumentation derives a
//! direct child of the operator's span — stages and branches appear as
//! siblings, not nested chains.

mod aggregate;
mod parallel;
mod router;
mod sequential;

pub use aggregate::Aggregate;
pub use parallel::{BranchResults, Parallel};
pub use router::Router;
pub use sequential::Sequential;

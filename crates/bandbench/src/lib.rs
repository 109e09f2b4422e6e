//! Library surface of the bandbench binary.
//!
//! `main.rs` wires these modules together; they are exposed as a library so
//! the orchestration logic can be driven directly from tests.

pub mod device;
pub mod measure;
pub mod orchestrate;
pub mod report;

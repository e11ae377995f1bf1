//! Asset checks: reachability, naming, redirectors, the orchestrator that runs
//! them, and the host mutations their fixes are expressed in.

pub mod actions;
pub mod checks;
pub mod exclusion;
pub mod naming_check;
pub mod orchestrator;
pub mod reachability;
pub mod redirector;

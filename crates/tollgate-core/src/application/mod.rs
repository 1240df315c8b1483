//! Application services for the Tollgate workflow core
//!
//! The workflow engine, provisioning, the review queue read side and the
//! SLA sweep live here, on top of the domain model and repositories.

pub mod provisioning_service;
pub mod review_queue_service;
pub mod sla_sweep;
pub mod workflow_service;

//! Domain model for the Tollgate approval workflow
//!
//! Contains the aggregates, value objects, domain events and the
//! repository interfaces the engine depends on.

pub mod application;
pub mod events;
pub mod license;
pub mod repository;
pub mod review_stage;

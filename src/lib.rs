//! VPM: Vehicle Parts MDM
//!
//! A referential-integrity and lifecycle engine for a catalog of vehicle
//! parts, modules, manufacturers, certifications, procurement contracts and
//! manufacturer cross-references.

pub mod cli;
pub mod core;
pub mod entities;

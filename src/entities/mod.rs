//! Entity type definitions
//!
//! The catalog tracks the following entity types:
//!
//! - [`Manufacturer`] - suppliers of record with financial-health data
//! - [`Module`] - vehicle modules stocked as units
//! - [`Part`] - parts, optionally owned by a module, tagged by module type
//! - [`QualityCertification`] - certifications held by parts
//! - [`ProcurementContract`] - contracts with manufacturers
//! - [`CrossReference`] - manufacturer-specific sourcing terms for a part

pub mod certification;
pub mod contract;
pub mod cross_reference;
pub mod manufacturer;
pub mod module;
pub mod part;

pub use certification::QualityCertification;
pub use contract::ProcurementContract;
pub use cross_reference::CrossReference;
pub use manufacturer::Manufacturer;
pub use module::Module;
pub use part::Part;

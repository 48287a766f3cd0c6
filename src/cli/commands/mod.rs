//! CLI command implementations

pub mod alerts;
pub mod audit;
pub mod cert;
pub mod contract;
pub mod import;
pub mod init;
pub mod lifecycle;
pub mod mfr;
pub mod module;
pub mod part;
pub mod query;
pub mod show;
pub mod stock;
pub mod xref;

//! Core module - catalog engine and supporting types

pub mod audit;
pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod financials;
pub mod graph;
pub mod identity;
pub mod import;
pub mod locks;
pub mod monitor;
pub mod persistence;
pub mod project;
pub mod query;
pub mod record;
pub mod snapshot;
pub mod store;
pub mod validator;

pub use audit::AuditRecord;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use entity::{Criticality, Entity, FinancialHealth, OperationalStatus, PriceRisk};
pub use error::{CatalogError, DanglingReason};
pub use identity::{EntityId, EntityKind, IdParseError};
pub use monitor::Alert;
pub use persistence::{MemoryPersistence, Persistence, PersistenceError, SqlitePersistence};
pub use project::{Project, ProjectError};
pub use query::{Facade, PartQuery, PartSort};
pub use record::{Patch, Record, StoredRecord};
pub use snapshot::CatalogSnapshot;
pub use store::{CatalogStore, RetireOutcome, StoreOptions};

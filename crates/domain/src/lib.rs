//! Strata DNS Domain Layer
pub mod cache;
pub mod config;
pub mod errors;
pub mod group;
pub mod query_event;
pub mod question;
pub mod record_type;

pub use cache::{CacheEntry, CacheKey, ENTRY_HEADER_LEN};
pub use config::{Config, ConfigError};
pub use errors::ResolveError;
pub use group::{CompiledPause, GroupId, DEFAULT_GROUP};
pub use query_event::{QueryEvent, QueryOutcome};
pub use question::Question;
pub use record_type::RecordType;

pub mod analytics;
pub mod block_filter;
pub mod shared_cache;
pub mod upstream;

pub use analytics::QueryEventSink;
pub use block_filter::BlockFilterEngine;
pub use shared_cache::SharedCacheStore;
pub use upstream::{UpstreamAnswer, UpstreamExchanger};

pub mod memory;
pub mod redis_store;

pub use memory::MemorySharedCache;
pub use redis_store::RedisSharedCache;

//! Key store implementations for the flush subsystem

pub mod glob;
pub mod memory_store;
pub mod redis_store;

pub use memory_store::MemoryKeyStore;
pub use redis_store::RedisKeyStore;

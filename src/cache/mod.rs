//! In-memory cache with time-to-live semantics
//!
//! This module provides a key-value store whose entries expire after a
//! configurable TTL, plus a background task that periodically sweeps expired
//! entries. Nothing is persisted: the cache lives as long as the process.

mod sweeper;
mod ttl;

pub use sweeper::{CacheSweeper, SweepHandle};
pub use ttl::{lock_cache, SharedCache, TtlCache};

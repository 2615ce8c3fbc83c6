// ABOUTME: Root module for tether - concurrency-safe resource primitives.
// ABOUTME: Bounded LRU cache, reusable object pool, and deadline-bounded executor.

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod pool;
pub mod prelude;

pub use error::TetherError;

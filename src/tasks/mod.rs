//! Background Tasks Module
//!
//! Contains background tasks that run alongside the server.
//!
//! # Tasks
//! - Warm-up: Streams a list of keys through the cache before serving traffic

mod warmup;

pub use warmup::{spawn_warmup, WarmupReport};

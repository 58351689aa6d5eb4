//! Background Tasks Module
//!
//! Contains the tasks that run alongside the cache.
//!
//! # Tasks
//! - Expiration timer: wakes the cache when the soonest TTL elapses

mod expiration;

pub(crate) use expiration::{spawn_expiration_task, ExpirationTarget, ExpirationTimer};

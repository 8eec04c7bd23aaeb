//! Blocking synchronization primitives for producer/consumer pipelines.
//!
//! This module provides a counting semaphore and, built on top of it, a
//! fixed-capacity bounded buffer that blocks producers when full and
//! consumers when empty.

pub mod buffer;
pub mod sem;

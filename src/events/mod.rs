// src/events/mod.rs
//! Event bus
//!
//! Decouples producers of domain events (run completion, model builds,
//! challenges, incumbent changes) from consumers (termination tracking,
//! logging, statistics).
//!
//! - **Event**: closed set of tagged event variants
//! - **EventManager**: handler registry, asynchronous dispatch, flush barrier
//!
//! # Architecture
//!
//! ```text
//!  fire(A) ─┐                      ┌──> handler A1
//!  fire(B) ─┼─> unbounded queue ───┼──> handler A2      (single dispatch
//!  flush() ─┘   (FIFO, all kinds)  ├──> handler B1       thread, global
//!     ▲                            └──> barrier ──┐      enqueue order)
//!     └───────────────── released ────────────────┘
//! ```

pub mod bus;
pub mod event;

pub use bus::{EventBusStats, EventHandler, EventManager};
pub use event::{Event, EventKind};

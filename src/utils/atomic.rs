// src/utils/atomic.rs
//! Lock-free `f64` accumulator

use std::sync::atomic::{AtomicU64, Ordering};

/// `f64` stored as its bit pattern in an `AtomicU64`
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Add `delta`, returning the previous value
    pub fn fetch_add(&self, delta: f64) -> f64 {
        let previous = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        f64::from_bits(previous)
    }
}

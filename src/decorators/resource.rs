// src/decorators/resource.rs
//! Reducible counting resource
//!
//! A counting semaphore whose permit count may be reduced below zero (the
//! deficit is paid back by later releases). Permits are held by RAII
//! [`ResourcePermit`] guards, so every exit path releases them.

use crate::utils::errors::{EngineError, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug)]
struct ResourceState {
    available: isize,
    closed: bool,
}

/// Counting resource shared by acquirers
#[derive(Debug)]
pub struct BoundedResource {
    state: Mutex<ResourceState>,
    released: Condvar,
}

impl BoundedResource {
    pub fn new(permits: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ResourceState {
                available: permits as isize,
                closed: false,
            }),
            released: Condvar::new(),
        })
    }

    /// Block until `count` permits are available
    pub fn acquire(self: &Arc<Self>, count: usize) -> Result<ResourcePermit> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(EngineError::EvaluatorShutdown(
                    "resource closed while waiting for capacity".to_string(),
                ));
            }
            if state.available >= count as isize {
                state.available -= count as isize;
                return Ok(self.permit(count));
            }
            self.released.wait(&mut state);
        }
    }

    /// Block until at least one permit is available, then take as many as
    /// are available up to `max`
    pub fn acquire_up_to(self: &Arc<Self>, max: usize) -> Result<ResourcePermit> {
        if max == 0 {
            return Ok(self.permit(0));
        }

        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(EngineError::EvaluatorShutdown(
                    "resource closed while waiting for capacity".to_string(),
                ));
            }
            if state.available > 0 {
                let count = (state.available as usize).min(max);
                state.available -= count as isize;
                trace!("Acquired {} permits, {} remaining", count, state.available);
                return Ok(self.permit(count));
            }
            self.released.wait(&mut state);
        }
    }

    /// Take `count` permits if they are available right now
    pub fn try_acquire(self: &Arc<Self>, count: usize) -> Option<ResourcePermit> {
        let mut state = self.state.lock();
        if !state.closed && state.available >= count as isize {
            state.available -= count as isize;
            Some(self.permit(count))
        } else {
            None
        }
    }

    /// Permits currently available; negative after `reduce_permits`
    pub fn available_permits(&self) -> isize {
        self.state.lock().available
    }

    /// Remove permits without acquiring them
    pub fn reduce_permits(&self, count: usize) {
        self.state.lock().available -= count as isize;
    }

    /// Wake every waiter with a shutdown error; later acquires fail
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.released.notify_all();
    }

    fn release(&self, count: usize) {
        if count == 0 {
            return;
        }
        let mut state = self.state.lock();
        state.available += count as isize;
        drop(state);
        self.released.notify_all();
    }

    fn permit(self: &Arc<Self>, count: usize) -> ResourcePermit {
        ResourcePermit {
            resource: Arc::clone(self),
            count,
        }
    }
}

/// Permits held until dropped
#[derive(Debug)]
pub struct ResourcePermit {
    resource: Arc<BoundedResource>,
    count: usize,
}

impl ResourcePermit {
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Drop for ResourcePermit {
    fn drop(&mut self) {
        self.resource.release(self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_acquire_release() {
        let resource = BoundedResource::new(3);
        let permit = resource.acquire(2).unwrap();
        assert_eq!(resource.available_permits(), 1);
        assert!(resource.try_acquire(2).is_none());

        drop(permit);
        assert_eq!(resource.available_permits(), 3);
    }

    #[test]
    fn test_acquire_up_to() {
        let resource = BoundedResource::new(2);
        let permit = resource.acquire_up_to(5).unwrap();
        assert_eq!(permit.count(), 2);
        assert_eq!(resource.available_permits(), 0);
    }

    #[test]
    fn test_reduce_permits_goes_negative() {
        let resource = BoundedResource::new(1);
        resource.reduce_permits(2);
        assert_eq!(resource.available_permits(), -1);
        assert!(resource.try_acquire(1).is_none());
    }

    #[test]
    fn test_blocked_acquire_wakes_on_release() {
        let resource = BoundedResource::new(1);
        let held = resource.acquire(1).unwrap();

        let waiter = Arc::clone(&resource);
        let handle = thread::spawn(move || waiter.acquire(1).map(|p| p.count()));

        thread::sleep(Duration::from_millis(30));
        drop(held);
        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_close_fails_waiters() {
        let resource = BoundedResource::new(0);
        let waiter = Arc::clone(&resource);
        let handle = thread::spawn(move || waiter.acquire(1).is_err());

        thread::sleep(Duration::from_millis(30));
        resource.close();
        assert!(handle.join().unwrap());
    }
}

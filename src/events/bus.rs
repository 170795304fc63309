// src/events/bus.rs
//! Event manager with a single dispatch thread
//!
//! `fire` never blocks: it enqueues one dispatch task per registered handler
//! and returns. One named thread drains the queue and runs handlers in
//! enqueue order across all event kinds. `flush` enqueues a barrier and
//! waits for the dispatch thread to reach it.

use crate::events::{Event, EventKind};
use crate::utils::errors::{EngineError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, info, warn};

const DISPATCH_THREAD_NAME: &str = "Event Manager Dispatch Thread";

/// Queue depth at which the first high-load warning is logged
const INITIAL_LOAD_WARNING_THRESHOLD: usize = 128;

/// Receives events of the kinds it was registered for
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event) -> Result<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&Event) -> Result<()> + Send + Sync,
{
    fn handle(&self, event: &Event) -> Result<()> {
        self(event)
    }
}

type SharedHandler = Arc<dyn EventHandler>;

enum DispatchTask {
    Handle {
        event: Arc<Event>,
        handler: SharedHandler,
    },
    /// Flush sentinel; released once everything queued before it ran
    Barrier(Sender<()>),
}

/// Event bus statistics
#[derive(Debug, Clone)]
pub struct EventBusStats {
    /// Events accepted by `fire`
    pub fired: u64,

    /// Handler invocations completed
    pub dispatched: u64,

    /// Dispatch tasks waiting in the queue
    pub queued: usize,
}

/// State shared with the dispatch thread
struct Dispatcher {
    sender: RwLock<Option<Sender<DispatchTask>>>,
    handlers: DashMap<EventKind, Vec<SharedHandler>>,
    fired: DashMap<EventKind, u64>,
    dispatched: AtomicU64,
    load_warning_threshold: AtomicUsize,
}

impl Dispatcher {
    fn enqueue(&self, event: Event) -> Result<()> {
        let guard = self.sender.read();
        let sender = guard.as_ref().ok_or(EngineError::EventBusShutdown)?;

        let kind = event.kind();
        let handlers: Vec<SharedHandler> = self
            .handlers
            .get(&kind)
            .map(|h| h.value().clone())
            .unwrap_or_default();

        *self.fired.entry(kind).or_insert(0) += 1;

        let event = Arc::new(event);
        for handler in handlers {
            sender
                .send(DispatchTask::Handle {
                    event: Arc::clone(&event),
                    handler,
                })
                .map_err(|_| EngineError::EventBusShutdown)?;
        }

        self.check_load(sender.len());
        Ok(())
    }

    fn enqueue_barrier(&self) -> Result<Receiver<()>> {
        let (signal, wait) = bounded(1);
        let guard = self.sender.read();
        let sender = guard.as_ref().ok_or(EngineError::EventBusShutdown)?;
        sender
            .send(DispatchTask::Barrier(signal))
            .map_err(|_| EngineError::EventBusShutdown)?;
        Ok(wait)
    }

    fn check_load(&self, depth: usize) {
        let threshold = self.load_warning_threshold.load(Ordering::Relaxed);
        if depth > threshold
            && self
                .load_warning_threshold
                .compare_exchange(threshold, threshold * 2, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        {
            warn!(
                "Event manager is under high load, {} dispatches queued (next warning at {})",
                depth,
                threshold * 2
            );
        }
    }

    fn run(&self, tasks: Receiver<DispatchTask>) {
        for task in tasks.iter() {
            match task {
                DispatchTask::Barrier(signal) => {
                    let _ = signal.send(());
                }
                DispatchTask::Handle { event, handler } => {
                    let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(&event)));
                    self.dispatched.fetch_add(1, Ordering::Relaxed);

                    let message = match outcome {
                        Ok(Ok(())) => continue,
                        Ok(Err(e)) => e.to_string(),
                        Err(panic) => panic_message(panic.as_ref()),
                    };

                    let kind = event.kind();
                    error!("Event handler failed while processing {}: {}", kind, message);

                    if kind != EventKind::HandlerError {
                        if let Err(e) = self.enqueue(Event::HandlerError {
                            source: kind,
                            message,
                        }) {
                            debug!("Could not report handler failure: {}", e);
                        }
                    }
                }
            }
        }

        debug!("{} exiting", DISPATCH_THREAD_NAME);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}

struct Inner {
    dispatcher: Arc<Dispatcher>,
    dispatch_thread: ThreadId,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown: AtomicBool,
    deadlocked: AtomicBool,
    shutdown_lock: Mutex<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Closing the channel lets the dispatch thread drain and exit
        self.dispatcher.sender.write().take();
    }
}

/// Mediator between event producers and handlers. Cloning shares the bus.
#[derive(Clone)]
pub struct EventManager {
    inner: Arc<Inner>,
}

impl EventManager {
    /// Create a bus and start its dispatch thread
    pub fn new() -> Result<Self> {
        let (sender, receiver) = unbounded();

        let dispatcher = Arc::new(Dispatcher {
            sender: RwLock::new(Some(sender)),
            handlers: DashMap::new(),
            fired: DashMap::new(),
            dispatched: AtomicU64::new(0),
            load_warning_threshold: AtomicUsize::new(INITIAL_LOAD_WARNING_THRESHOLD),
        });

        let worker_dispatcher = Arc::clone(&dispatcher);
        let worker = thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.to_string())
            .spawn(move || worker_dispatcher.run(receiver))?;

        debug!("Started {}", DISPATCH_THREAD_NAME);

        Ok(Self {
            inner: Arc::new(Inner {
                dispatcher,
                dispatch_thread: worker.thread().id(),
                worker: Mutex::new(Some(worker)),
                shutdown: AtomicBool::new(false),
                deadlocked: AtomicBool::new(false),
                shutdown_lock: Mutex::new(()),
            }),
        })
    }

    /// Register a handler for one event kind. Handlers of the same kind run
    /// in registration order.
    pub fn register_handler<H>(&self, kind: EventKind, handler: H) -> Result<()>
    where
        H: EventHandler + 'static,
    {
        self.register_shared_handler(kind, Arc::new(handler))
    }

    pub fn register_shared_handler(
        &self,
        kind: EventKind,
        handler: Arc<dyn EventHandler>,
    ) -> Result<()> {
        if self.is_shutdown() {
            return Err(EngineError::EventBusShutdown);
        }

        self.inner
            .dispatcher
            .handlers
            .entry(kind)
            .or_default()
            .push(handler);
        Ok(())
    }

    /// Enqueue `event` for every handler registered for its kind
    pub fn fire(&self, event: Event) -> Result<()> {
        self.check_not_deadlocked()?;
        if self.is_shutdown() {
            return Err(EngineError::EventBusShutdown);
        }
        self.inner.dispatcher.enqueue(event)
    }

    /// Block until every event fired before this call has been dispatched
    pub fn flush(&self) -> Result<()> {
        self.detect_deadlock()?;
        if self.is_shutdown() {
            return Err(EngineError::EventBusShutdown);
        }
        self.wait_for_barrier()
    }

    /// Fire the shutdown event, drain the queue and stop the dispatch thread
    pub fn shutdown(&self) -> Result<()> {
        let _guard = self.inner.shutdown_lock.lock();
        if self.is_shutdown() {
            debug!("Event manager already shutdown");
            return Ok(());
        }

        self.detect_deadlock()?;

        self.inner.dispatcher.enqueue(Event::Shutdown)?;
        self.wait_for_barrier()?;

        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.dispatcher.sender.write().take();

        if let Some(worker) = self.inner.worker.lock().take() {
            worker
                .join()
                .map_err(|_| EngineError::Internal(format!("{} panicked", DISPATCH_THREAD_NAME)))?;
        }

        let mut counts: Vec<(EventKind, u64)> = self
            .inner
            .dispatcher
            .fired
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        counts.sort();
        for (kind, count) in counts {
            debug!("Event {} was fired {} times", kind, count);
        }

        info!("Event manager shutdown complete");
        Ok(())
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    /// Number of times events of `kind` were fired
    pub fn fired_count(&self, kind: EventKind) -> u64 {
        self.inner
            .dispatcher
            .fired
            .get(&kind)
            .map(|c| *c.value())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> EventBusStats {
        let dispatcher = &self.inner.dispatcher;
        let queued = dispatcher
            .sender
            .read()
            .as_ref()
            .map(|s| s.len())
            .unwrap_or(0);

        EventBusStats {
            fired: dispatcher.fired.iter().map(|c| *c.value()).sum(),
            dispatched: dispatcher.dispatched.load(Ordering::Relaxed),
            queued,
        }
    }

    fn wait_for_barrier(&self) -> Result<()> {
        let wait = self.inner.dispatcher.enqueue_barrier()?;
        wait.recv().map_err(|_| EngineError::EventBusShutdown)
    }

    fn check_not_deadlocked(&self) -> Result<()> {
        if self.inner.deadlocked.load(Ordering::SeqCst) {
            return Err(EngineError::Deadlock(
                "Event manager is unusable after a detected deadlock".to_string(),
            ));
        }
        Ok(())
    }

    fn detect_deadlock(&self) -> Result<()> {
        self.check_not_deadlocked()?;

        if thread::current().id() == self.inner.dispatch_thread {
            self.inner.deadlocked.store(true, Ordering::SeqCst);
            error!(
                "Deadlock detected: flush was called from the {} (a handler is waiting on its own queue). \
                 The event manager is now permanently unusable.",
                DISPATCH_THREAD_NAME
            );
            return Err(EngineError::Deadlock(format!(
                "flush called from the {}",
                DISPATCH_THREAD_NAME
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        label: &'static str,
    ) -> impl Fn(&Event) -> Result<()> + Send + Sync {
        let log = Arc::clone(log);
        move |_event: &Event| {
            log.lock().push(label.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_fire_then_flush_preserves_order() {
        let bus = EventManager::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.register_handler(EventKind::ModelBuildStart, recorder(&log, "start-1")).unwrap();
        bus.register_handler(EventKind::ModelBuildStart, recorder(&log, "start-2")).unwrap();
        bus.register_handler(EventKind::ModelBuildEnd, recorder(&log, "end-1")).unwrap();

        bus.fire(Event::ModelBuildStart).unwrap();
        bus.fire(Event::ModelBuildEnd).unwrap();
        bus.fire(Event::ModelBuildStart).unwrap();
        bus.flush().unwrap();

        assert_eq!(
            *log.lock(),
            vec!["start-1", "start-2", "end-1", "start-1", "start-2"]
        );
        bus.shutdown().unwrap();
    }

    #[test]
    fn test_flush_waits_for_slow_handlers() {
        let bus = EventManager::new().unwrap();
        let done = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&done);
        bus.register_handler(EventKind::ModelBuildEnd, move |_e: &Event| -> Result<()> {
            thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        bus.fire(Event::ModelBuildEnd).unwrap();
        bus.flush().unwrap();
        assert!(done.load(Ordering::SeqCst));
        bus.shutdown().unwrap();
    }

    #[test]
    fn test_flush_from_handler_is_deadlock() {
        let bus = EventManager::new().unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let handler_bus = bus.clone();
        bus.register_handler(EventKind::ModelBuildStart, move |_e: &Event| -> Result<()> {
            let _ = tx.send(handler_bus.flush());
            Ok(())
        })
        .unwrap();

        bus.fire(Event::ModelBuildStart).unwrap();

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(EngineError::Deadlock(_))));

        // Latched: later use fails fast from any thread
        assert!(matches!(bus.flush(), Err(EngineError::Deadlock(_))));
        assert!(matches!(bus.fire(Event::ModelBuildEnd), Err(EngineError::Deadlock(_))));
    }

    #[test]
    fn test_handler_failure_fires_error_event() {
        let bus = EventManager::new().unwrap();
        let sources = Arc::new(Mutex::new(Vec::new()));

        bus.register_handler(EventKind::ModelBuildStart, |_e: &Event| -> Result<()> {
            Err(EngineError::Internal("boom".into()))
        })
        .unwrap();
        bus.register_handler(EventKind::ModelBuildEnd, |_e: &Event| -> Result<()> {
            panic!("handler exploded")
        })
        .unwrap();

        let seen = Arc::clone(&sources);
        bus.register_handler(EventKind::HandlerError, move |e: &Event| -> Result<()> {
            if let Event::HandlerError { source, .. } = e {
                seen.lock().push(*source);
            }
            Ok(())
        })
        .unwrap();

        bus.fire(Event::ModelBuildStart).unwrap();
        bus.fire(Event::ModelBuildEnd).unwrap();
        bus.flush().unwrap();
        bus.flush().unwrap();

        assert_eq!(
            *sources.lock(),
            vec![EventKind::ModelBuildStart, EventKind::ModelBuildEnd]
        );
        bus.shutdown().unwrap();
    }

    #[test]
    fn test_failing_error_handler_does_not_recurse() {
        let bus = EventManager::new().unwrap();

        bus.register_handler(EventKind::ModelBuildStart, |_e: &Event| -> Result<()> {
            Err(EngineError::Internal("first".into()))
        })
        .unwrap();
        bus.register_handler(EventKind::HandlerError, |_e: &Event| -> Result<()> {
            Err(EngineError::Internal("second".into()))
        })
        .unwrap();

        bus.fire(Event::ModelBuildStart).unwrap();
        for _ in 0..3 {
            bus.flush().unwrap();
        }

        assert_eq!(bus.fired_count(EventKind::HandlerError), 1);
        bus.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_rejects_further_use() {
        let bus = EventManager::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.register_handler(EventKind::Shutdown, recorder(&log, "shutdown")).unwrap();

        bus.shutdown().unwrap();
        assert!(bus.is_shutdown());
        assert_eq!(*log.lock(), vec!["shutdown"]);

        assert!(matches!(bus.fire(Event::ModelBuildEnd), Err(EngineError::EventBusShutdown)));
        assert!(matches!(bus.flush(), Err(EngineError::EventBusShutdown)));
        assert!(matches!(
            bus.register_handler(EventKind::ModelBuildEnd, recorder(&log, "late")),
            Err(EngineError::EventBusShutdown)
        ));

        // Second shutdown is a no-op
        bus.shutdown().unwrap();
    }

    #[test]
    fn test_concurrent_fire() {
        let bus = EventManager::new().unwrap();
        let count = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&count);
        bus.register_handler(EventKind::ModelBuildEnd, move |_e: &Event| -> Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        let mut handles = vec![];
        for _ in 0..8 {
            let b = bus.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    b.fire(Event::ModelBuildEnd).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        bus.flush().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 800);

        let stats = bus.stats();
        assert_eq!(stats.fired, 800);
        assert_eq!(stats.dispatched, 800);
        bus.shutdown().unwrap();
    }
}

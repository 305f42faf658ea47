//! Change notification.
//!
//! Observers register with a repository and are told when note-pad data
//! changed or when the repository closed. Delivery always goes through a
//! [`Dispatcher`], the "run this on the coordination thread" primitive: the
//! attached one when a UI-capable context is open, otherwise a default
//! [`CoordinatorThread`] started on first use.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::JoinHandle;

use tracing::{error, warn};

/// A unit of work posted to a dispatcher.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Receives repository events.
///
/// Callbacks run on the dispatcher's thread, never on the thread that
/// performed the mutation (unless the dispatcher runs tasks inline).
pub trait NotePadObserver: Send + Sync {
    /// Note-pad data changed.
    fn on_data_changed(&self);

    /// The last session released the repository; it is no longer usable
    /// until reopened.
    fn on_repository_closed(&self) {}
}

/// Runs tasks on a designated coordination context.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, task: Task);
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateDispatcher;

impl Dispatcher for ImmediateDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// A dedicated thread that runs posted tasks in order.
pub struct CoordinatorThread {
    sender: Mutex<Option<Sender<Task>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CoordinatorThread {
    /// Start a coordinator thread with the given name.
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Task>();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for task in receiver {
                    task();
                }
            })?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Block until every task posted so far has run.
    pub fn flush(&self) {
        let (done, wait) = mpsc::channel();
        self.dispatch(Box::new(move || {
            let _ = done.send(());
        }));
        let _ = wait.recv();
    }

    fn sender(&self) -> MutexGuard<'_, Option<Sender<Task>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Dispatcher for CoordinatorThread {
    fn dispatch(&self, task: Task) {
        let sent = match self.sender().as_ref() {
            Some(sender) => sender.send(task).is_ok(),
            None => false,
        };
        if !sent {
            warn!("coordinator thread stopped; dropping notification");
        }
    }
}

impl Drop for CoordinatorThread {
    fn drop(&mut self) {
        self.sender().take();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            // Dropped from inside one of our own tasks: joining would deadlock.
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// The process-wide fallback used while no dispatcher is attached.
fn default_dispatcher() -> Option<&'static CoordinatorThread> {
    static DEFAULT: OnceLock<Option<CoordinatorThread>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| match CoordinatorThread::spawn("notepad-main") {
            Ok(thread) => Some(thread),
            Err(err) => {
                error!(error = %err, "failed to start default notification thread");
                None
            }
        })
        .as_ref()
}

/// Which event to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    DataChanged,
    RepositoryClosed,
}

/// The observer list of one repository plus its dispatch target.
#[derive(Default)]
pub(crate) struct Notifier {
    observers: Mutex<Vec<Arc<dyn NotePadObserver>>>,
    dispatcher: Mutex<Option<Arc<dyn Dispatcher>>>,
}

impl Notifier {
    pub fn register(&self, observer: Arc<dyn NotePadObserver>) {
        let mut observers = self.observers();
        if !observers.iter().any(|known| Arc::ptr_eq(known, &observer)) {
            observers.push(observer);
        }
    }

    pub fn unregister(&self, observer: &Arc<dyn NotePadObserver>) -> bool {
        let mut observers = self.observers();
        let before = observers.len();
        observers.retain(|known| !Arc::ptr_eq(known, observer));
        observers.len() != before
    }

    pub fn attach(&self, dispatcher: Arc<dyn Dispatcher>) {
        *self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(dispatcher);
    }

    pub fn detach(&self) -> bool {
        self.dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Post `event` to a snapshot of the current observers.
    pub fn post(&self, event: Event) {
        let observers = self.observers().clone();
        if observers.is_empty() {
            return;
        }

        let task: Task = Box::new(move || deliver(&observers, event));
        let attached = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match attached {
            Some(dispatcher) => dispatcher.dispatch(task),
            None => match default_dispatcher() {
                Some(fallback) => fallback.dispatch(task),
                None => task(),
            },
        }
    }

    fn observers(&self) -> MutexGuard<'_, Vec<Arc<dyn NotePadObserver>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Deliver one event; a panicking observer is logged and skipped.
fn deliver(observers: &[Arc<dyn NotePadObserver>], event: Event) {
    for observer in observers {
        let outcome = catch_unwind(AssertUnwindSafe(|| match event {
            Event::DataChanged => observer.on_data_changed(),
            Event::RepositoryClosed => observer.on_repository_closed(),
        }));
        if outcome.is_err() {
            error!(?event, "note-pad observer panicked; skipping it");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::ThreadId;

    #[derive(Default)]
    struct Counting {
        changed: AtomicUsize,
        closed: AtomicUsize,
        thread: Mutex<Option<ThreadId>>,
    }

    impl NotePadObserver for Counting {
        fn on_data_changed(&self) {
            self.changed.fetch_add(1, Ordering::SeqCst);
            *self.thread.lock().unwrap() = Some(std::thread::current().id());
        }

        fn on_repository_closed(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicking;

    impl NotePadObserver for Panicking {
        fn on_data_changed(&self) {
            panic!("observer failure");
        }
    }

    #[test]
    fn test_inline_delivery() {
        let notifier = Notifier::default();
        notifier.attach(Arc::new(ImmediateDispatcher));
        let observer = Arc::new(Counting::default());
        notifier.register(observer.clone());
        notifier.register(observer.clone());

        notifier.post(Event::DataChanged);
        notifier.post(Event::RepositoryClosed);
        assert_eq!(observer.changed.load(Ordering::SeqCst), 1);
        assert_eq!(observer.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister() {
        let notifier = Notifier::default();
        notifier.attach(Arc::new(ImmediateDispatcher));
        let observer = Arc::new(Counting::default());
        let handle: Arc<dyn NotePadObserver> = observer.clone();
        notifier.register(handle.clone());
        assert!(notifier.unregister(&handle));
        assert!(!notifier.unregister(&handle));

        notifier.post(Event::DataChanged);
        assert_eq!(observer.changed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_observer_does_not_block_siblings() {
        let notifier = Notifier::default();
        notifier.attach(Arc::new(ImmediateDispatcher));
        let observer = Arc::new(Counting::default());
        notifier.register(Arc::new(Panicking));
        notifier.register(observer.clone());

        notifier.post(Event::DataChanged);
        assert_eq!(observer.changed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_coordinator_thread_delivery() {
        let coordinator = Arc::new(CoordinatorThread::spawn("notepad-test-ui").unwrap());
        let notifier = Notifier::default();
        notifier.attach(coordinator.clone());
        let observer = Arc::new(Counting::default());
        notifier.register(observer.clone());

        notifier.post(Event::DataChanged);
        coordinator.flush();

        assert_eq!(observer.changed.load(Ordering::SeqCst), 1);
        let delivered_on = observer.thread.lock().unwrap().unwrap();
        assert_ne!(delivered_on, std::thread::current().id());
    }

    #[test]
    fn test_detached_falls_back_to_default_thread() {
        let notifier = Notifier::default();
        let observer = Arc::new(Counting::default());
        notifier.register(observer.clone());
        assert!(!notifier.detach());

        notifier.post(Event::DataChanged);
        default_dispatcher().unwrap().flush();
        assert_eq!(observer.changed.load(Ordering::SeqCst), 1);
    }
}

//! Execution threads.
//!
//! A [`Thread`] carries everything one evaluation needs besides the program:
//! the call stack, the print hook, the step budget, the cancellation flag and
//! host-supplied thread locals. Threads are cheap; create one per evaluation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::info;

use super::interpreter::Frame;
use crate::error::{CallFrame, CallStack};

type PrintHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
}

/// Requests cancellation of a running thread from anywhere.
///
/// The interpreter polls the flag at calls and jumps, so a cancelled thread
/// stops at the next such point with `computation cancelled: REASON`.
#[derive(Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    /// Cancels the thread. The first reason wins.
    pub fn cancel(&self, reason: impl Into<String>) {
        let mut slot = self.state.reason.lock();
        if slot.is_none() {
            *slot = Some(reason.into());
        }
        self.state.cancelled.store(true, Ordering::Release);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn reason(&self) -> Option<String> {
        if !self.is_cancelled() {
            return None;
        }
        self.state.reason.lock().clone()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// The state of one evaluation.
pub struct Thread {
    name: String,
    print: PrintHook,
    pub(crate) cancel: CancelHandle,
    pub(crate) max_steps: u64,
    pub(crate) steps: u64,
    locals: FxHashMap<String, Box<dyn Any + Send>>,
    pub(crate) frames: Vec<Frame>,
}

impl Thread {
    /// Creates a thread. Output of `print` goes to the `tracing` log at
    /// info level until a hook is installed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            print: Arc::new(|thread: &str, msg: &str| info!(thread, "{}", msg)),
            cancel: CancelHandle::default(),
            max_steps: 0,
            steps: 0,
            locals: FxHashMap::default(),
            frames: Vec::new(),
        }
    }

    /// The thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the print hook. It receives the thread name and the message.
    pub fn set_print(&mut self, hook: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.print = Arc::new(hook);
    }

    /// Sends a message to the print hook.
    pub fn print(&self, msg: &str) {
        (self.print)(&self.name, msg);
    }

    /// Returns a handle that can cancel this thread from another one.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Limits execution to `max_steps` instructions; zero means unlimited.
    pub fn set_max_steps(&mut self, max_steps: u64) {
        self.max_steps = max_steps;
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Stores a host value under `key`.
    pub fn set_local<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.locals.insert(key.into(), Box::new(value));
    }

    /// Returns the host value stored under `key`, if it has type `T`.
    pub fn local<T: Any + Send>(&self, key: &str) -> Option<&T> {
        self.locals.get(key)?.downcast_ref()
    }

    /// Returns the active call stack, outermost frame first.
    pub fn call_stack(&self) -> CallStack {
        CallStack(self.frames.iter().map(Frame::call_frame).collect::<Vec<CallFrame>>())
    }

    /// Number of active frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .field("max_steps", &self.max_steps)
            .field("depth", &self.frames.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_keeps_first_reason() {
        let thread = Thread::new("t");
        let handle = thread.cancel_handle();
        assert!(!handle.is_cancelled());
        handle.cancel("deadline");
        handle.cancel("later");
        assert!(thread.cancel.is_cancelled());
        assert_eq!(thread.cancel.reason().as_deref(), Some("deadline"));
    }

    #[test]
    fn test_thread_locals() {
        let mut thread = Thread::new("t");
        thread.set_local("request", 42u32);
        assert_eq!(thread.local::<u32>("request"), Some(&42));
        assert_eq!(thread.local::<String>("request"), None);
        assert_eq!(thread.local::<u32>("missing"), None);
    }

    #[test]
    fn test_print_hook_receives_thread_name() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut thread = Thread::new("worker-1");
        thread.set_print(move |name, msg| sink.lock().push(format!("{}: {}", name, msg)));
        thread.print("hello");
        assert_eq!(*seen.lock(), vec!["worker-1: hello".to_string()]);
    }

    #[test]
    fn test_idle_thread_has_empty_call_stack() {
        let thread = Thread::new("t");
        assert!(thread.call_stack().is_empty());
        assert_eq!(thread.depth(), 0);
        assert_eq!(thread.steps(), 0);
    }
}

//! Per-service task queue.
//!
//! `send` never dispatches inline. Events and flushed closures are appended
//! here and processed in FIFO order when the owner calls
//! [`Service::run_pending`](crate::service::Service::run_pending).

use crate::core::MachineTypes;
use crate::service::Params;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

pub(crate) type FlushFn<T> = Box<dyn FnOnce(&Params<'_, T>)>;

pub(crate) enum Task<T: MachineTypes> {
    Event(T::Event),
    Flush(FlushFn<T>),
}

pub(crate) struct EventQueue<T: MachineTypes> {
    tasks: RefCell<VecDeque<Task<T>>>,
    on_schedule: Option<Box<dyn Fn()>>,
}

impl<T: MachineTypes> EventQueue<T> {
    pub(crate) fn new(on_schedule: Option<Box<dyn Fn()>>) -> Self {
        Self {
            tasks: RefCell::new(VecDeque::new()),
            on_schedule,
        }
    }

    /// Append a task. The schedule hook fires when the queue was empty.
    pub(crate) fn push(&self, task: Task<T>) {
        let was_empty = {
            let mut tasks = self.tasks.borrow_mut();
            let was_empty = tasks.is_empty();
            tasks.push_back(task);
            was_empty
        };
        if was_empty {
            if let Some(hook) = &self.on_schedule {
                hook();
            }
        }
    }

    pub(crate) fn pop(&self) -> Option<Task<T>> {
        self.tasks.borrow_mut().pop_front()
    }

    /// Drop every queued task, returning how many were dropped.
    pub(crate) fn clear(&self) -> usize {
        let dropped: Vec<Task<T>> = self.tasks.borrow_mut().drain(..).collect();
        dropped.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.borrow().len()
    }
}

/// Cloneable handle for sending events to a service from outside a dispatch
/// cycle, such as from a timer started by an effect.
///
/// The handle does not keep the service alive; sending after the service
/// was dropped returns `false`.
pub struct EventSender<T: MachineTypes> {
    queue: Weak<EventQueue<T>>,
}

impl<T: MachineTypes> EventSender<T> {
    pub(crate) fn new(queue: &Rc<EventQueue<T>>) -> Self {
        Self {
            queue: Rc::downgrade(queue),
        }
    }

    /// Enqueue an event. Returns whether the service still exists.
    pub fn send(&self, event: T::Event) -> bool {
        match self.queue.upgrade() {
            Some(queue) => {
                queue.push(Task::Event(event));
                true
            }
            None => {
                tracing::trace!(?event, "service dropped, event discarded");
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.queue.strong_count() > 0
    }
}

impl<T: MachineTypes> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Weak::clone(&self.queue),
        }
    }
}

impl<T: MachineTypes> fmt::Debug for EventSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("connected", &self.is_connected())
            .finish()
    }
}

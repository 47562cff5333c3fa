//! Dependency-tracked callbacks registered from a schema's `watch` hook.

use crate::core::{default_hash, MachineTypes};
use crate::service::Params;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub(crate) type DepsFn<T> = Box<dyn Fn(&Params<'_, T>) -> Vec<<T as MachineTypes>::Value>>;
pub(crate) type TrackFn<T> = Box<dyn Fn(&Params<'_, T>)>;

struct Tracker<T: MachineTypes> {
    deps: DepsFn<T>,
    effect: TrackFn<T>,
    last: RefCell<String>,
}

/// Trackers of the current activation.
///
/// Registrations are accepted only while the `watch` hook runs, so the list
/// is bounded by what one activation declares.
pub(crate) struct Trackers<T: MachineTypes> {
    entries: RefCell<Vec<Rc<Tracker<T>>>>,
    collecting: Cell<bool>,
}

impl<T: MachineTypes> Trackers<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            collecting: Cell::new(false),
        }
    }

    /// Run `watch` with registrations open.
    pub(crate) fn collect(&self, watch: impl FnOnce()) {
        self.collecting.set(true);
        watch();
        self.collecting.set(false);
    }

    pub(crate) fn is_collecting(&self) -> bool {
        self.collecting.get()
    }

    /// Register a tracker. Its dependencies are captured now; the effect
    /// only runs once they change.
    pub(crate) fn register(&self, deps: DepsFn<T>, effect: TrackFn<T>, params: &Params<'_, T>) {
        let last = default_hash(&deps(params));
        self.entries.borrow_mut().push(Rc::new(Tracker {
            deps,
            effect,
            last: RefCell::new(last),
        }));
    }

    /// Re-evaluate every tracker, running the effects whose dependencies
    /// changed. Returns how many effects ran.
    pub(crate) fn run(&self, params: &Params<'_, T>) -> usize {
        let trackers: Vec<Rc<Tracker<T>>> = self.entries.borrow().iter().cloned().collect();
        let mut fired = 0;
        for tracker in trackers {
            let hash = default_hash(&(tracker.deps)(params));
            if *tracker.last.borrow() == hash {
                continue;
            }
            tracker.last.replace(hash);
            (tracker.effect)(params);
            fired += 1;
        }
        fired
    }

    pub(crate) fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

//! Effect cleanups and the per-service cleanup registry.

use std::fmt;

/// Teardown returned by an effect implementation.
///
/// # Example
///
/// ```rust
/// use statekit::service::Cleanup;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let stopped = Rc::new(Cell::new(false));
/// let flag = Rc::clone(&stopped);
/// let cleanup = Cleanup::new(move || flag.set(true));
///
/// cleanup.run();
/// assert!(stopped.get());
/// ```
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self(Box::new(f))
    }

    pub fn run(self) {
        (self.0)()
    }

    /// One cleanup running `cleanups` in order, or `None` when there are none.
    pub fn all(cleanups: Vec<Cleanup>) -> Option<Cleanup> {
        match cleanups.len() {
            0 => None,
            1 => cleanups.into_iter().next(),
            _ => Some(Cleanup::new(move || {
                for cleanup in cleanups {
                    cleanup.run();
                }
            })),
        }
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup(..)")
    }
}

/// Where a cleanup is registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum EffectSlot<S> {
    /// Root effects, live for the whole activation.
    Root,
    State(S),
}

/// Live cleanups in registration order, at most one per slot.
pub(crate) struct EffectRegistry<S> {
    entries: Vec<(EffectSlot<S>, Cleanup)>,
}

impl<S: PartialEq> EffectRegistry<S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `cleanup` under `slot`.
    ///
    /// An occupied slot keeps its position; the displaced cleanup is returned
    /// so the caller can run it outside any borrow of the registry.
    pub(crate) fn insert(&mut self, slot: EffectSlot<S>, cleanup: Cleanup) -> Option<Cleanup> {
        match self.entries.iter_mut().find(|(existing, _)| *existing == slot) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, cleanup)),
            None => {
                self.entries.push((slot, cleanup));
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, slot: &EffectSlot<S>) -> Option<Cleanup> {
        let index = self.entries.iter().position(|(existing, _)| existing == slot)?;
        Some(self.entries.remove(index).1)
    }

    /// Take every cleanup, oldest registration first.
    pub(crate) fn drain(&mut self) -> Vec<Cleanup> {
        self.entries.drain(..).map(|(_, cleanup)| cleanup).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<S: fmt::Debug> fmt::Debug for EffectRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(slot, _)| slot))
            .finish()
    }
}

//! Mutable handles owned by a service.
//!
//! Refs hold values that are not reactive (measurement targets, timer
//! handles, last pointer position). The engine only creates them; actions
//! and effects read and write them.

use std::cell::{Ref, RefCell};
use std::fmt;

pub struct Refs<R> {
    inner: RefCell<R>,
}

impl<R> Refs<R> {
    pub fn new(refs: R) -> Self {
        Self {
            inner: RefCell::new(refs),
        }
    }

    /// Shared access.
    ///
    /// # Panics
    ///
    /// Panics if called inside [`Refs::with_mut`] on the same refs.
    pub fn get(&self) -> Ref<'_, R> {
        self.inner.borrow()
    }

    /// Scoped mutable access.
    pub fn with_mut<O>(&self, f: impl FnOnce(&mut R) -> O) -> O {
        f(&mut self.inner.borrow_mut())
    }

    /// Replace every ref, returning the previous set.
    pub fn replace(&self, refs: R) -> R {
        self.inner.replace(refs)
    }
}

impl<R: Default> Default for Refs<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}

impl<R: fmt::Debug> fmt::Debug for Refs<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Refs").field(&self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct CarouselRefs {
        drag_start: Option<(f64, f64)>,
        timer: Option<u32>,
    }

    #[test]
    fn with_mut_writes_are_visible() {
        let refs = Refs::new(CarouselRefs::default());
        refs.with_mut(|r| r.drag_start = Some((4.0, 2.0)));
        assert_eq!(refs.get().drag_start, Some((4.0, 2.0)));
    }

    #[test]
    fn replace_returns_previous() {
        let refs = Refs::new(CarouselRefs {
            drag_start: None,
            timer: Some(3),
        });
        let previous = refs.replace(CarouselRefs::default());
        assert_eq!(previous.timer, Some(3));
        assert!(refs.get().timer.is_none());
    }
}

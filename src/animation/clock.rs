//! Shared millisecond clock for a set of animated objects.

use std::cell::Cell;
use std::rc::Rc;

/// A time provider shared by every mark of a [`MarkSet`].
///
/// Cloning yields another handle onto the same clock. The clock only moves
/// when [`advance`](Self::advance) is called, once per render tick.
///
/// [`MarkSet`]: crate::marks::MarkSet
#[derive(Debug, Clone, Default)]
pub struct Clock {
    now: Rc<Cell<f64>>,
}

impl Clock {
    /// Clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in milliseconds.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.now.get()
    }

    /// Move the clock forward by `dt` milliseconds.
    pub fn advance(&self, dt: f64) {
        self.now.set(self.now.get() + dt);
    }
}

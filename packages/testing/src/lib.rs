#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in the `virtual_vec` package.
//!
//! The main item is [`Tracked`], an element type that reports every clone, assignment and drop
//! to a shared [`LifecycleCounts`]. Container tests use it to verify exactly how many element
//! lifecycle events an operation causes.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Shared counters of element lifecycle events.
///
/// Cloning the counters gives another handle to the same counts. The counters are
/// single-threaded, which is all that container tests need.
#[derive(Clone, Debug, Default)]
pub struct LifecycleCounts {
    inner: Rc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    clones: Cell<usize>,
    assignments: Cell<usize>,
    drops: Cell<usize>,
}

impl LifecycleCounts {
    /// Creates a new set of counters, all at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values created by [`Clone::clone`].
    #[must_use]
    pub fn clones(&self) -> usize {
        self.inner.clones.get()
    }

    /// Number of times an existing value was overwritten by [`Clone::clone_from`].
    #[must_use]
    pub fn assignments(&self) -> usize {
        self.inner.assignments.get()
    }

    /// Number of values dropped.
    #[must_use]
    pub fn drops(&self) -> usize {
        self.inner.drops.get()
    }

    /// Sets all counters back to zero, typically after setting up the scenario under test.
    pub fn reset(&self) {
        self.inner.clones.set(0);
        self.inner.assignments.set(0);
        self.inner.drops.set(0);
    }

    fn increment(counter: &Cell<usize>) {
        counter.set(counter.get().wrapping_add(1));
    }
}

/// A value that records its lifecycle events in a [`LifecycleCounts`].
///
/// Creating a value with [`Tracked::new()`] is not counted, so tests can set up their inputs
/// freely. Cloning, assigning via [`Clone::clone_from`] and dropping are all counted.
///
/// # Example
///
/// ```rust
/// use testing::{LifecycleCounts, Tracked};
///
/// let counts = LifecycleCounts::new();
///
/// let original = Tracked::new(&counts, 42);
/// let mut copy = original.clone();
/// copy.clone_from(&original);
/// drop(copy);
///
/// assert_eq!(counts.clones(), 1);
/// assert_eq!(counts.assignments(), 1);
/// assert_eq!(counts.drops(), 1);
/// ```
pub struct Tracked {
    counts: LifecycleCounts,
    value: usize,
}

impl Tracked {
    /// Creates a value that reports to `counts`. This event itself is not counted.
    #[must_use]
    pub fn new(counts: &LifecycleCounts, value: usize) -> Self {
        Self {
            counts: counts.clone(),
            value,
        }
    }

    /// The payload given when the value (or the value it was cloned from) was created.
    #[must_use]
    pub fn value(&self) -> usize {
        self.value
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        LifecycleCounts::increment(&self.counts.inner.clones);

        Self {
            counts: self.counts.clone(),
            value: self.value,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        LifecycleCounts::increment(&source.counts.inner.assignments);

        self.counts.clone_from(&source.counts);
        self.value = source.value;
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        LifecycleCounts::increment(&self.counts.inner.drops);
    }
}

impl fmt::Debug for Tracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

//! Explicitly released host references.

/// A cell holding at most one host reference.
///
/// The held value is dropped only through [`Persistent::reset`],
/// [`Persistent::release`] or dropping the cell itself, which keeps the point
/// of release under the bridge's control rather than the host collector's.
#[derive(Debug)]
pub struct Persistent<T> {
    value: Option<T>,
}

impl<T> Persistent<T> {
    /// An empty cell.
    pub const fn empty() -> Self {
        Self { value: None }
    }

    /// A cell holding `value`.
    pub fn new(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// Replace the held value, releasing the previous one.
    ///
    /// Returns true if a previous value was released.
    pub fn reset(&mut self, value: T) -> bool {
        self.value.replace(value).is_some()
    }

    /// Release the held value. Returns true if there was one.
    pub fn release(&mut self) -> bool {
        self.value.take().is_some()
    }

    /// Borrow the held value.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Returns true if no value is held.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }
}

impl<T: Clone> Persistent<T> {
    /// Clone the held value out of the cell.
    pub fn cloned(&self) -> Option<T> {
        self.value.clone()
    }
}

impl<T> Default for Persistent<T> {
    fn default() -> Self {
        Self::empty()
    }
}

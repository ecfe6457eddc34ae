//! Non-empty vector.
//!
//! A dispatch batch always carries at least one tool call; modelling it as
//! `NonEmptyVec<ToolCallRequest>` keeps the empty batch out of the executor.

use std::fmt;

/// A vector that is guaranteed to contain at least one element.
///
/// ```rust
/// use runloop_core::collections::NonEmptyVec;
///
/// let vec = NonEmptyVec::new(1, vec![2, 3]);
/// assert_eq!(vec.head(), &1);
/// assert_eq!(vec.tail(), &[2, 3]);
/// assert_eq!(vec.len(), 3);
///
/// assert!(NonEmptyVec::<u8>::try_from(Vec::new()).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyVec<T> {
    head: T,
    tail: Vec<T>,
}

impl<T> NonEmptyVec<T> {
    /// Create a new non-empty vector from a head element and any tail elements.
    pub fn new(head: T, tail: Vec<T>) -> Self {
        NonEmptyVec { head, tail }
    }

    /// Create a non-empty vector with a single element.
    pub fn singleton(value: T) -> Self {
        NonEmptyVec {
            head: value,
            tail: Vec::new(),
        }
    }

    /// The first element.
    pub fn head(&self) -> &T {
        &self.head
    }

    /// All elements after the first.
    pub fn tail(&self) -> &[T] {
        &self.tail
    }

    /// Number of elements; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }

    pub fn into_vec(self) -> Vec<T> {
        let mut vec = Vec::with_capacity(1 + self.tail.len());
        vec.push(self.head);
        vec.extend(self.tail);
        vec
    }
}

/// Error returned when converting an empty `Vec` into a [`NonEmptyVec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyVecError;

impl fmt::Display for EmptyVecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot build a non-empty vector from an empty vector")
    }
}

impl std::error::Error for EmptyVecError {}

impl<T> TryFrom<Vec<T>> for NonEmptyVec<T> {
    type Error = EmptyVecError;

    fn try_from(mut vec: Vec<T>) -> Result<Self, Self::Error> {
        if vec.is_empty() {
            return Err(EmptyVecError);
        }
        let head = vec.remove(0);
        Ok(NonEmptyVec { head, tail: vec })
    }
}

impl<T> From<NonEmptyVec<T>> for Vec<T> {
    fn from(vec: NonEmptyVec<T>) -> Self {
        vec.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_from_keeps_order() {
        let vec = NonEmptyVec::try_from(vec!["a", "b", "c"]).unwrap();
        assert_eq!(vec.head(), &"a");
        assert_eq!(vec.into_vec(), vec!["a", "b", "c"]);
    }

    #[test]
    fn singleton_has_empty_tail() {
        let vec = NonEmptyVec::singleton(7);
        assert!(vec.tail().is_empty());
        assert_eq!(vec.len(), 1);
    }
}

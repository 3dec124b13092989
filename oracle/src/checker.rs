//! Stateless invariant checker trait.

use std::fmt::Debug;

use crate::error::CheckError;

/// A single-shot property over one decoded input.
///
/// Implementations carry no state between inputs. Returning
/// [`CheckError::Discard`] filters an input out of the generation space;
/// returning [`CheckError::Violation`] reports a real failure.
pub trait InvariantChecker {
    /// The decoded input this checker consumes
    type Input: Debug;

    /// Stable name used in logs and violation reports
    fn name(&self) -> &'static str;

    /// Check the property against one input
    fn check(&self, input: &Self::Input) -> Result<(), CheckError>;
}

impl<C: InvariantChecker + ?Sized> InvariantChecker for &C {
    type Input = C::Input;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn check(&self, input: &Self::Input) -> Result<(), CheckError> {
        (**self).check(input)
    }
}

/// Adapter turning a closure into a checker
pub struct FnChecker<T, F>
where
    F: Fn(&T) -> Result<(), CheckError>,
{
    name: &'static str,
    check_fn: F,
    _phantom: std::marker::PhantomData<fn(&T)>,
}

impl<T, F> FnChecker<T, F>
where
    F: Fn(&T) -> Result<(), CheckError>,
{
    pub fn new(name: &'static str, check_fn: F) -> Self {
        Self {
            name,
            check_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: Debug, F> InvariantChecker for FnChecker<T, F>
where
    F: Fn(&T) -> Result<(), CheckError>,
{
    type Input = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn check(&self, input: &T) -> Result<(), CheckError> {
        (self.check_fn)(input)
    }
}

//! Success-or-failure container with short-circuiting transformations

use crate::Either;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// A captured failure
pub type Failure = Arc<dyn Error + Send + Sync + 'static>;

/// Either a success value or a captured failure.
///
/// Transformations applied to a failed `Try` are skipped, so a chain of
/// dependent stages (resolve, translate, evaluate) stops at the first error
/// and the final consumer decides how to report it.
#[derive(Clone)]
pub struct Try<T> {
    inner: Either<Failure, T>,
}

impl<T> Try<T> {
    pub fn of(value: T) -> Self {
        Self {
            inner: Either::Right(value),
        }
    }

    pub fn failure<E>(error: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        Self {
            inner: Either::Left(Arc::from(error.into())),
        }
    }

    /// Wrap a failure captured by an earlier stage
    pub fn from_failure(failure: Failure) -> Self {
        Self {
            inner: Either::Left(failure),
        }
    }

    /// Run a fallible computation, capturing its error
    pub fn attempt<E>(f: impl FnOnce() -> Result<T, E>) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        Self::from_result(f())
    }

    pub fn from_result<E>(result: Result<T, E>) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        match result {
            Ok(value) => Self::of(value),
            Err(err) => Self::failure(err),
        }
    }

    pub fn is_success(&self) -> bool {
        self.inner.is_right()
    }

    pub fn is_failure(&self) -> bool {
        self.inner.is_left()
    }

    pub fn value(&self) -> Option<&T> {
        self.inner.right()
    }

    pub fn failure_ref(&self) -> Option<&Failure> {
        self.inner.left()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Try<U> {
        Try {
            inner: self.inner.map(f),
        }
    }

    /// Apply a fallible stage; its error becomes the failure of the result.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Try<U>
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        match self.inner {
            Either::Left(failure) => Try {
                inner: Either::Left(failure),
            },
            Either::Right(value) => Try::from_result(f(value)),
        }
    }

    pub fn flat_map<U>(self, f: impl FnOnce(T) -> Try<U>) -> Try<U> {
        match self.inner {
            Either::Left(failure) => Try {
                inner: Either::Left(failure),
            },
            Either::Right(value) => f(value),
        }
    }

    pub fn fold<X>(self, on_failure: impl FnOnce(Failure) -> X, on_success: impl FnOnce(T) -> X) -> X {
        self.inner.fold(on_failure, on_success)
    }

    pub fn or_else(self, default: T) -> T {
        self.inner.right_or(default)
    }

    pub fn or_else_with(self, f: impl FnOnce(Failure) -> T) -> T {
        self.inner.right_or_fold(f)
    }

    pub fn into_result(self) -> Result<T, Failure> {
        self.inner.into_result()
    }
}

impl<T: fmt::Debug> fmt::Debug for Try<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Either::Left(failure) => f.debug_tuple("Failure").field(&failure.to_string()).finish(),
            Either::Right(value) => f.debug_tuple("Success").field(value).finish(),
        }
    }
}

//! Three-slot sum type

use octofhir_cr_diagnostics::{CR0003, CrError};
use thiserror::Error;

/// Violations of the "exactly one populated" invariant when building an
/// [`Either3`] from optional inputs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EitherError {
    #[error("exactly one value must be provided, none was")]
    NoneProvided,

    #[error("exactly one value must be provided, {count} were")]
    MultipleProvided { count: usize },
}

impl From<EitherError> for CrError {
    fn from(err: EitherError) -> Self {
        CrError::precondition(CR0003, err.to_string())
    }
}

/// Holds exactly one of a left, middle or right value.
///
/// Used for operation inputs that may be identified three ways, e.g. a
/// canonical URL, a resource id or an inline resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Either3<L, M, R> {
    Left(L),
    Middle(M),
    Right(R),
}

impl<L, M, R> Either3<L, M, R> {
    /// Build from nullable request inputs; exactly one must be `Some`.
    pub fn from_options(
        left: Option<L>,
        middle: Option<M>,
        right: Option<R>,
    ) -> Result<Self, EitherError> {
        let count = [left.is_some(), middle.is_some(), right.is_some()]
            .iter()
            .filter(|present| **present)
            .count();

        match (left, middle, right) {
            (Some(l), None, None) => Ok(Either3::Left(l)),
            (None, Some(m), None) => Ok(Either3::Middle(m)),
            (None, None, Some(r)) => Ok(Either3::Right(r)),
            (None, None, None) => Err(EitherError::NoneProvided),
            _ => Err(EitherError::MultipleProvided { count }),
        }
    }

    pub fn is_left(&self) -> bool {
        matches!(self, Either3::Left(_))
    }

    pub fn is_middle(&self) -> bool {
        matches!(self, Either3::Middle(_))
    }

    pub fn is_right(&self) -> bool {
        matches!(self, Either3::Right(_))
    }

    pub fn left(&self) -> Option<&L> {
        match self {
            Either3::Left(l) => Some(l),
            _ => None,
        }
    }

    pub fn middle(&self) -> Option<&M> {
        match self {
            Either3::Middle(m) => Some(m),
            _ => None,
        }
    }

    pub fn right(&self) -> Option<&R> {
        match self {
            Either3::Right(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Either3<&L, &M, &R> {
        match self {
            Either3::Left(l) => Either3::Left(l),
            Either3::Middle(m) => Either3::Middle(m),
            Either3::Right(r) => Either3::Right(r),
        }
    }

    pub fn fold<T>(
        self,
        on_left: impl FnOnce(L) -> T,
        on_middle: impl FnOnce(M) -> T,
        on_right: impl FnOnce(R) -> T,
    ) -> T {
        match self {
            Either3::Left(l) => on_left(l),
            Either3::Middle(m) => on_middle(m),
            Either3::Right(r) => on_right(r),
        }
    }

    /// Transform the right value; left and middle pass through unchanged.
    pub fn map<T>(self, f: impl FnOnce(R) -> T) -> Either3<L, M, T> {
        match self {
            Either3::Left(l) => Either3::Left(l),
            Either3::Middle(m) => Either3::Middle(m),
            Either3::Right(r) => Either3::Right(f(r)),
        }
    }

    /// Cyclic permutation: left becomes middle, middle becomes right and
    /// right becomes left.
    pub fn rotate(self) -> Either3<R, L, M> {
        match self {
            Either3::Left(l) => Either3::Middle(l),
            Either3::Middle(m) => Either3::Right(m),
            Either3::Right(r) => Either3::Left(r),
        }
    }

    /// Exchange the left and right slots.
    pub fn swap(self) -> Either3<R, M, L> {
        match self {
            Either3::Left(l) => Either3::Right(l),
            Either3::Middle(m) => Either3::Middle(m),
            Either3::Right(r) => Either3::Left(r),
        }
    }

    pub fn right_or(self, default: R) -> R {
        match self {
            Either3::Right(r) => r,
            _ => default,
        }
    }

    pub fn right_or_else(self, f: impl FnOnce() -> R) -> R {
        match self {
            Either3::Right(r) => r,
            _ => f(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    type Input = Either3<&'static str, &'static str, u32>;

    #[test]
    fn test_from_options_single_slot() {
        let value = Input::from_options(None, Some("Library/abc"), None).unwrap();
        assert_eq!(value, Either3::Middle("Library/abc"));
    }

    #[rstest]
    #[case(None, None, None, EitherError::NoneProvided)]
    #[case(Some("a"), Some("b"), None, EitherError::MultipleProvided { count: 2 })]
    #[case(Some("a"), None, Some(1), EitherError::MultipleProvided { count: 2 })]
    #[case(Some("a"), Some("b"), Some(1), EitherError::MultipleProvided { count: 3 })]
    fn test_from_options_rejects(
        #[case] left: Option<&'static str>,
        #[case] middle: Option<&'static str>,
        #[case] right: Option<u32>,
        #[case] expected: EitherError,
    ) {
        assert_eq!(Input::from_options(left, middle, right), Err(expected));
    }

    #[test]
    fn test_rotate_and_swap() {
        let left: Input = Either3::Left("canonical");
        let rotated: Either3<u32, &str, &str> = left.rotate();
        assert_eq!(rotated, Either3::Middle("canonical"));
        assert_eq!(rotated.rotate(), Either3::Right("canonical"));

        let right: Input = Either3::Right(3);
        assert_eq!(right.swap(), Either3::Left(3));
    }

    #[test]
    fn test_map_only_touches_right() {
        let middle: Input = Either3::Middle("id");
        assert_eq!(middle.map(|n| n + 1), Either3::Middle("id"));
        assert_eq!(Input::Right(1).map(|n| n + 1), Either3::Right(2));
        assert_eq!(middle.right_or(9), 9);
    }

    #[test]
    fn test_error_converts_to_precondition() {
        let err: CrError = EitherError::NoneProvided.into();
        assert_eq!(err.code(), CR0003);
    }
}

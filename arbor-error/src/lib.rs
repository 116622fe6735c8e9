#![feature(error_generic_member_access)]
#![deny(missing_docs)]

//! Error types shared by the Arbor crates.
//!
//! All fallible operations in Arbor return [`ArborResult`]. Errors are
//! constructed with the [`arbor_err!`] / [`arbor_bail!`] macros, which capture
//! a backtrace at the point of creation.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;

/// A (usually) heap-allocated error message, eagerly formatted at the error
/// site so it can outlive whatever produced it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ErrString(Cow<'static, str>);

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    fn from(msg: T) -> Self {
        Self(msg.into())
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

/// The top-level error type for all Arbor operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ArborError {
    /// A caller violated a function's contract.
    #[error("invalid argument: {0}\nBacktrace:\n{1}")]
    InvalidArgument(ErrString, Backtrace),
    /// On-disk or upstream metadata disagrees with the bytes actually read:
    /// inexact item division, out-of-bounds slice or compaction arguments,
    /// non-monotonic entry offsets.
    #[error("malformed segment: {0}\nBacktrace:\n{1}")]
    MalformedSegment(ErrString, Backtrace),
    /// The operation is not defined for the receiver.
    #[error("unsupported operation: {0}\nBacktrace:\n{1}")]
    Unsupported(ErrString, Backtrace),
    /// File open, read, or decompression failure. Fatal for the requested
    /// segment only; Arbor never retries internally.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

/// The result type returned by all fallible Arbor operations.
pub type ArborResult<T> = Result<T, ArborError>;

/// Construct an [`ArborError`].
///
/// The first form names a variant (`arbor_err!(MalformedSegment: "...", ..)`),
/// the second defaults to [`ArborError::InvalidArgument`].
#[macro_export]
macro_rules! arbor_err {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::ArborError::$variant(
            format!($fmt $(, $arg)*).into(),
            std::backtrace::Backtrace::capture(),
        )
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::arbor_err!(InvalidArgument: $fmt $(, $arg)*)
    };
}

/// Return early with an [`ArborError`]. Accepts the same forms as
/// [`arbor_err!`].
#[macro_export]
macro_rules! arbor_bail {
    ($($tt:tt)+) => {
        return Err($crate::arbor_err!($($tt)+))
    };
}

/// Panic with an [`ArborError`]. Accepts the same forms as [`arbor_err!`].
#[macro_export]
macro_rules! arbor_panic {
    ($($tt:tt)+) => {
        $crate::__private::panic_with($crate::arbor_err!($($tt)+))
    };
}


/// Unwrap an `Option` or [`ArborResult`], panicking with an Arbor-formatted
/// message. Reserved for invariants that the caller has already established.
pub trait ArborExpect {
    /// The unwrapped value type.
    type Output;

    /// Unwrap, panicking with `msg` (and the source error, if any).
    fn arbor_expect(self, msg: &str) -> Self::Output;
}

impl<T> ArborExpect for Option<T> {
    type Output = T;

    fn arbor_expect(self, msg: &str) -> T {
        self.unwrap_or_else(|| __private::panic_with(arbor_err!("{}", msg)))
    }
}

impl<T> ArborExpect for ArborResult<T> {
    type Output = T;

    fn arbor_expect(self, msg: &str) -> T {
        self.unwrap_or_else(|e| __private::panic_with(arbor_err!("{}: {}", msg, e)))
    }
}

/// Unwrap a `Result` whose error is displayable, panicking with an
/// Arbor-formatted message. Mostly used for integer narrowing at metadata
/// boundaries.
pub trait ArborUnwrap {
    /// The unwrapped value type.
    type Output;

    /// Unwrap, panicking on error.
    fn arbor_unwrap(self) -> Self::Output;
}

impl<T, E: Display> ArborUnwrap for Result<T, E> {
    type Output = T;

    fn arbor_unwrap(self) -> T {
        self.unwrap_or_else(|e| __private::panic_with(arbor_err!("{}", e)))
    }
}

#[doc(hidden)]
pub mod __private {
    use super::ArborError;

    #[allow(clippy::panic)]
    pub fn panic_with(err: ArborError) -> ! {
        panic!("{err}")
    }
}

//! Utilities shared by the clinical reasoning crates
//!
//! - [`Either`] and [`Either3`]: "exactly one of" containers used to carry
//!   identifying inputs (canonical, id or inline resource) through the
//!   resolution pipeline
//! - [`Try`]: a success value or a captured failure, with short-circuiting
//!   transformation chains
//! - [`compare_versions`]: dotted version ordering where an absent version
//!   sorts as the latest

pub mod either;
pub mod either3;
pub mod tries;
pub mod version;

pub use either::Either;
pub use either3::{Either3, EitherError};
pub use tries::{Failure, Try};
pub use version::{compare_versions, max_version};

//! Migrate installed CPAN modules from one perl to another.
//!
//! The source perl lists its installed modules, the list is piped into a
//! freshly downloaded `cpanm` running under the destination perl. The crate
//! keeps the same split as the rest of the workspace:
//!
//! - **[`core`]**: Pure, deterministic logic (argv construction, package list
//!   assembly, exit status aggregation). No I/O.
//! - **[`io`]**: Side-effecting operations (path checks, HTTP, child processes).
//!   Collaborators sit behind traits so tests can script them.
//!
//! [`migrate`] coordinates core logic with I/O to implement the CLI.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod migrate;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

//! Core of clusterlint: check registry, filters and execution engine.
//!
//! A lint run fetches one snapshot of cluster objects, runs every selected
//! check against it concurrently and filters the merged diagnostics:
//!
//! ```text
//! ObjectFilter ──► ObjectFetcher ──► Objects (shared, read-only)
//!                                        │
//! CheckFilter ──► Registry ──► checks ───┼──► worker per check
//!                                        │
//!                              Mutex<Vec<Diagnostic>>
//!                                        │
//!                 DiagnosticFilter (disable annotation, severity)
//!                                        │
//!                                        ▼
//!                                   CheckResult
//! ```
//!
//! # Example
//!
//! ```no_run
//! use clusterlint_core::{
//!     engine, CheckFilter, DiagnosticFilter, ObjectFetcher, ObjectFilter, Registry,
//! };
//!
//! # async fn example(fetcher: &dyn ObjectFetcher) -> clusterlint_core::Result<()> {
//! let registry = Registry::new();
//! // register checks here
//!
//! let result = engine::run(
//!     fetcher,
//!     &registry,
//!     &CheckFilter::all(),
//!     &DiagnosticFilter::default(),
//!     &ObjectFilter::all(),
//! )
//! .await?;
//!
//! for diagnostic in &result.diagnostics {
//!     println!("{diagnostic}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod annotation;
pub mod check;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod objects;
pub mod registry;

pub use annotation::{is_enabled, DISABLED_CHECKS_ANNOTATION};
pub use check::Check;
pub use diagnostic::{Diagnostic, Kind, ObjectRef, Severity};
pub use engine::{run, run_checks, CheckResult};
pub use error::{CheckError, LintError, Result};
pub use fetch::ObjectFetcher;
pub use filter::{CheckFilter, DiagnosticFilter, ObjectFilter};
pub use objects::{Objects, VolumeSnapshot, SYSTEM_NAMESPACE};
pub use registry::Registry;

#[cfg(any(test, feature = "test-utils"))]
pub use fetch::mock::StaticFetcher;

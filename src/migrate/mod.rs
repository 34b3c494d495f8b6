//! Migration layer.
//!
//! Each located repository goes through the same three steps:
//!
//! ```text
//!   RemoteBinder ──► LicenseInjector ──► PushDriver
//!   (lookup or       (only when the      (primary branch
//!    create hosted)   LICENSE is absent)   to the binding)
//! ```
//!
//! [`Pipeline`] runs those steps for one repository; [`BatchEngine`] runs the
//! pipeline over a whole root with retry cycles and progress reporting.

mod binder;
mod engine;
mod error;
mod injector;
mod pipeline;
mod push;
mod queue;

pub use binder::{RemoteBinder, RemoteBinding};
pub use engine::{AttemptRecord, AttemptStatus, BatchEngine, BatchReport};
pub use error::{MigrateError, MigrateResult};
pub use injector::{append_readme, LicenseInjector, LICENSE_NAME, README_NAME};
pub use pipeline::{Migrate, MigrationOutcome, Pipeline};
pub use push::PushDriver;
pub use queue::{Pending, RetryQueue};

//! gitmigrate - move a tree of local git repositories to a hosted organization
//!
//! Every repository found under a root gets a hosted counterpart (created if
//! absent), a `LICENSE` commit on its primary branch when it has none, and a
//! push of that branch. The batch runs in retry cycles until every
//! repository succeeded, was skipped or ran out of attempts.
//!
//! # Example
//!
//! ```no_run
//! use gitmigrate::config::MigrateConfig;
//! use gitmigrate::migrate::{BatchEngine, Pipeline};
//! use gitmigrate::session::Session;
//!
//! let config = MigrateConfig::new("acme");
//! let session = Session::establish(&config).unwrap();
//! let mut engine = BatchEngine::new(Pipeline::new(&config, &session), config.retry.clone());
//! let report = engine
//!     .run_root("/srv/repos".as_ref(), |record| println!("{record}"))
//!     .unwrap();
//! println!("{report}");
//! ```

pub mod config;
pub mod git;
pub mod hosted;
pub mod migrate;
pub mod session;

//! local git layer for gitmigrate
//!
//! this module is the only place that talks to git2. The migration layer
//! uses the API below to find repositories, probe their primary branch,
//! configure remotes, author the license commit and push.
//!
//!  # Architecture
//!
//! ```text
//!  ┌─────────────┐        ┌──────────────────────────────────────┐
//!  │   locator   │        │           LocalRepository            │
//!  │ (discovery) │        │ (probe, remotes, clone, commit, push)│
//!  └─────────────┘        └──────────────────────────────────────┘
//!                                  │                 │
//!                                  ▼                 ▼
//!                           ┌─────────────┐   ┌─────────────┐
//!                           │    refs     │   │   commit    │
//!                           │ (branches)  │   │ (authoring) │
//!                           └─────────────┘   └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gitmigrate::git::{locate, BranchName, LocalRepository};
//!
//! for handle in locate("/srv/repos")? {
//!     let repo = LocalRepository::open(handle.path())?;
//!     let licensed = repo.has_root_entry(&BranchName::main(), "LICENSE")?;
//! }
//! ```

mod commit;
mod error;
mod locator;
mod refs;
mod repository;
mod types;

pub use error::{GitError, GitResult};
pub use locator::{detect, locate};
pub use repository::{set_network_timeout, LocalRepository};
pub use types::{
    BranchName, CommitId, GitSignature, InvalidNameError, RepoKind, RepositoryHandle, TreeId,
};

#[cfg(test)]
pub(crate) use repository::tests::{bare_with, parents_of, worktree_with};

//! License injection.
//!
//! Repositories whose primary branch lacks a root `LICENSE` get one through a
//! scratch clone: the license and default README are added there and
//! committed. Bare originals receive the commit by a push from the clone.
//! Working-tree originals fetch it and fast-forward, since git won't push into
//! a non-bare repository; their checkout is updated only when that is safe.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::MigrateConfig;
use crate::git::{CommitId, GitError, LocalRepository, RepoKind, RepositoryHandle};
use crate::migrate::error::{MigrateError, MigrateResult};

/// Root entry whose presence means the repository is already licensed.
pub const LICENSE_NAME: &str = "LICENSE";
/// README created in the clone when it has none.
pub const README_NAME: &str = "README.md";

const SCRATCH_MARKER: &str = ".scratch-";
/// length of the random suffix tempfile appends
const SCRATCH_SUFFIX_LEN: usize = 6;

pub struct LicenseInjector<'c> {
    config: &'c MigrateConfig,
    /// names whose leftovers from earlier runs were already cleared
    swept: Mutex<HashSet<String>>,
}

impl<'c> LicenseInjector<'c> {
    pub fn new(config: &'c MigrateConfig) -> Self {
        Self {
            config,
            swept: Mutex::new(HashSet::new()),
        }
    }

    /// Whether the primary branch already has a root `LICENSE`.
    pub fn has_license(&self, handle: &RepositoryHandle) -> MigrateResult<bool> {
        let repo = LocalRepository::open(handle.path())?;
        Ok(repo.has_root_entry(&self.config.branch, LICENSE_NAME)?)
    }

    /// Add the license commit unless the repository is already licensed.
    ///
    /// Returns true if a commit was made.
    pub fn inject_if_missing(&self, handle: &RepositoryHandle) -> MigrateResult<bool> {
        if self.has_license(handle)? {
            debug!(repo = handle.name(), "license present");
            return Ok(false);
        }
        let id = self.inject(handle)?;
        info!(repo = handle.name(), commit = %id.short(), "license committed");
        Ok(true)
    }

    /// Run the clone, commit, push-back workflow in a fresh scratch directory.
    ///
    /// On failure the scratch directory is kept and its path logged.
    pub fn inject(&self, handle: &RepositoryHandle) -> MigrateResult<CommitId> {
        let root = &self.config.scratch_root;
        fs::create_dir_all(root).map_err(|e| MigrateError::io(root, e))?;
        self.sweep_stale(handle.name());

        let scratch = tempfile::Builder::new()
            .prefix(&scratch_prefix(handle.name()))
            .rand_bytes(SCRATCH_SUFFIX_LEN)
            .tempdir_in(root)
            .map_err(|e| MigrateError::io(root, e))?;

        match self.inject_in(handle, &scratch.path().join(handle.name())) {
            Ok(id) => {
                let path = scratch.path().to_path_buf();
                if let Err(e) = scratch.close() {
                    warn!(path = %path.display(), error = %e, "could not remove scratch directory");
                }
                Ok(id)
            }
            Err(e) => {
                let kept = scratch.keep();
                warn!(repo = handle.name(), path = %kept.display(), "license injection failed, scratch directory kept");
                Err(e)
            }
        }
    }

    fn inject_in(&self, handle: &RepositoryHandle, clone_path: &Path) -> MigrateResult<CommitId> {
        let branch = &self.config.branch;
        let clone = LocalRepository::clone_from(handle.path(), clone_path, branch)?;
        let workdir = clone
            .workdir()
            .ok_or_else(|| GitError::Internal("scratch clone has no working tree".into()))?;

        let license = workdir.join(LICENSE_NAME);
        fs::copy(&self.config.license_file, &license)
            .map_err(|e| MigrateError::io(&self.config.license_file, e))?;

        let readme = existing_readme(&workdir)?.unwrap_or_else(|| README_NAME.to_string());
        append_readme(&self.config.readme_file, &workdir.join(&readme))?;

        let id = clone.commit_worktree(
            branch,
            &[LICENSE_NAME, readme.as_str()],
            &self.config.commit_message,
            &self.config.signature,
        )?;

        match handle.kind() {
            RepoKind::Bare => clone.push("origin", branch, None)?,
            RepoKind::Tree => {
                LocalRepository::open(handle.path())?.fast_forward_from(clone.path(), branch, id)?
            }
        }
        Ok(id)
    }

    /// Remove scratch directories for `name` left behind by earlier runs.
    ///
    /// Runs once per name, so directories kept after a failure in this run
    /// survive for inspection.
    fn sweep_stale(&self, name: &str) {
        if !self.swept.lock().insert(name.to_string()) {
            return;
        }

        let root = &self.config.scratch_root;
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %root.display(), error = %e, "cannot list scratch root");
                return;
            }
        };

        let prefix = scratch_prefix(name);
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(suffix) = file_name.to_str().and_then(|n| n.strip_prefix(&prefix)) else {
                continue;
            };
            if suffix.len() != SCRATCH_SUFFIX_LEN || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => debug!(path = %entry.path().display(), "removed stale scratch directory"),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "cannot remove stale scratch directory")
                }
            }
        }
    }
}

fn scratch_prefix(name: &str) -> String {
    format!("{name}{SCRATCH_MARKER}")
}

/// First root file named `README` or `README.<ext>`, any case.
fn existing_readme(workdir: &Path) -> MigrateResult<Option<String>> {
    let entries = fs::read_dir(workdir).map_err(|e| MigrateError::io(workdir, e))?;
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_readme(name))
        .collect();
    names.sort();
    Ok(names.into_iter().next())
}

fn is_readme(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "readme" || lower.starts_with("readme.")
}

/// Append the default README to `target`, or create `target` from it.
///
/// Existing content is kept byte for byte as a prefix.
pub fn append_readme(default: &Path, target: &Path) -> MigrateResult<()> {
    let boilerplate = fs::read(default).map_err(|e| MigrateError::io(default, e))?;

    let contents = match fs::read(target) {
        Ok(mut existing) => {
            if !existing.is_empty() && !existing.ends_with(b"\n") {
                existing.push(b'\n');
            }
            existing.extend_from_slice(&boilerplate);
            existing
        }
        Err(e) if e.kind() == ErrorKind::NotFound => boilerplate,
        Err(e) => return Err(MigrateError::io(target, e)),
    };

    fs::write(target, contents).map_err(|e| MigrateError::io(target, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{bare_with, parents_of, worktree_with, BranchName};
    use git2::Repository;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        config: MigrateConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let license = dir.path().join("assets/LICENSE");
            let readme = dir.path().join("assets/README.md");
            fs::create_dir_all(license.parent().unwrap()).unwrap();
            fs::write(&license, "MIT License\n").unwrap();
            fs::write(&readme, "Licensed under MIT.\n").unwrap();

            let config = MigrateConfig::new("acme")
                .license_assets(license, readme)
                .scratch_root(dir.path().join("scratch"));
            Self { dir, config }
        }

        fn bare(&self, name: &str, files: &[(&str, &str)]) -> RepositoryHandle {
            let path = self.dir.path().join("repos").join(name);
            bare_with(&path, files);
            RepositoryHandle::new(path, RepoKind::Bare)
        }

        fn worktree(&self, name: &str, files: &[(&str, &str)]) -> RepositoryHandle {
            let path = self.dir.path().join("repos").join(name);
            worktree_with(&path, files);
            RepositoryHandle::new(path, RepoKind::Tree)
        }

        fn scratch_entries(&self) -> Vec<PathBuf> {
            match fs::read_dir(&self.config.scratch_root) {
                Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
                Err(_) => Vec::new(),
            }
        }
    }

    fn blob_text(handle: &RepositoryHandle, name: &str) -> String {
        let repo = Repository::open(handle.path()).unwrap();
        let tree = repo.revparse_single("main^{tree}").unwrap().peel_to_tree().unwrap();
        let entry = tree.get_name(name).unwrap();
        let blob = repo.find_blob(entry.id()).unwrap();
        String::from_utf8(blob.content().to_vec()).unwrap()
    }

    #[test]
    fn test_noop_when_license_present() {
        let fx = Fixture::new();
        let handle = fx.bare("licensed.git", &[("LICENSE", "Apache"), ("code.rs", "fn main() {}")]);
        let repo = LocalRepository::open(handle.path()).unwrap();
        let before = repo.branch_tip(&BranchName::main()).unwrap();

        let injector = LicenseInjector::new(&fx.config);
        assert!(injector.has_license(&handle).unwrap());
        assert!(!injector.inject_if_missing(&handle).unwrap());
        assert_eq!(repo.branch_tip(&BranchName::main()).unwrap(), before);
        assert!(fx.scratch_entries().is_empty());
    }

    #[test]
    fn test_injects_single_commit_on_primary_branch() {
        let fx = Fixture::new();
        let handle = fx.bare("tools.git", &[("code.rs", "fn main() {}")]);
        let repo = LocalRepository::open(handle.path()).unwrap();
        let main = BranchName::main();
        let before = repo.branch_tip(&main).unwrap();

        let injector = LicenseInjector::new(&fx.config);
        assert!(injector.inject_if_missing(&handle).unwrap());

        let tip = repo.branch_tip(&main).unwrap();
        assert_eq!(parents_of(handle.path(), tip), vec![before]);
        let raw = Repository::open(handle.path()).unwrap();
        let commit = raw.find_commit(tip.raw()).unwrap();
        assert_eq!(commit.summary(), Some("Adding LICENSE info"));
        assert_eq!(commit.author().name(), Some("Repository Migrator"));
        assert!(repo.has_root_entry(&main, "LICENSE").unwrap());
        assert!(repo.has_root_entry(&main, "README.md").unwrap());
        assert!(repo.has_root_entry(&main, "code.rs").unwrap());
        assert_eq!(blob_text(&handle, "LICENSE"), "MIT License\n");

        // scratch clone is gone after success
        assert!(fx.scratch_entries().is_empty());

        // second run is a no-op
        assert!(!injector.inject_if_missing(&handle).unwrap());
        assert_eq!(repo.branch_tip(&main).unwrap(), tip);
    }

    #[test]
    fn test_existing_readme_is_prefix() {
        let fx = Fixture::new();
        let original = "# Tools\n\nInternal tooling.";
        let handle = fx.bare("tools.git", &[("README.md", original)]);

        LicenseInjector::new(&fx.config).inject_if_missing(&handle).unwrap();

        let readme = blob_text(&handle, "README.md");
        assert!(readme.starts_with(original));
        assert_eq!(readme, "# Tools\n\nInternal tooling.\nLicensed under MIT.\n");
    }

    #[test]
    fn test_injects_into_working_tree() {
        let fx = Fixture::new();
        let handle = fx.worktree("app", &[("code.rs", "fn main() {}")]);
        let repo = LocalRepository::open(handle.path()).unwrap();
        let main = BranchName::main();
        let before = repo.branch_tip(&main).unwrap();

        let injector = LicenseInjector::new(&fx.config);
        assert!(injector.inject_if_missing(&handle).unwrap());

        let tip = repo.branch_tip(&main).unwrap();
        assert_eq!(parents_of(handle.path(), tip), vec![before]);
        assert!(repo.has_root_entry(&main, "LICENSE").unwrap());
        assert!(repo.has_root_entry(&main, "README.md").unwrap());

        // the checkout follows the branch and stays clean
        assert_eq!(fs::read_to_string(handle.path().join("LICENSE")).unwrap(), "MIT License\n");
        let raw = Repository::open(handle.path()).unwrap();
        assert!(raw.status_file(std::path::Path::new("LICENSE")).unwrap().is_empty());
        assert!(fx.scratch_entries().is_empty());

        assert!(!injector.inject_if_missing(&handle).unwrap());
    }

    #[test]
    fn test_other_readme_spelling_is_extended() {
        let fx = Fixture::new();
        let handle = fx.bare("docs.git", &[("README.rst", "Docs\n====\n")]);

        LicenseInjector::new(&fx.config).inject_if_missing(&handle).unwrap();

        let repo = LocalRepository::open(handle.path()).unwrap();
        assert!(!repo.has_root_entry(&BranchName::main(), "README.md").unwrap());
        assert_eq!(blob_text(&handle, "README.rst"), "Docs\n====\nLicensed under MIT.\n");
    }

    #[test]
    fn test_readme_names() {
        for name in ["README", "README.md", "readme.rst", "Readme.txt"] {
            assert!(is_readme(name), "{name}");
        }
        for name in ["READMEFIRST", "docs.md", "LICENSE"] {
            assert!(!is_readme(name), "{name}");
        }
    }

    #[test]
    fn test_failure_keeps_scratch_directory() {
        let mut fx = Fixture::new();
        let handle = fx.bare("tools.git", &[("code.rs", "x")]);
        fx.config.license_file = fx.dir.path().join("assets/MISSING");

        let err = LicenseInjector::new(&fx.config).inject_if_missing(&handle).unwrap_err();
        assert!(matches!(err, MigrateError::Io { .. }));
        assert!(err.is_transient());

        let kept = fx.scratch_entries();
        assert_eq!(kept.len(), 1);
        assert!(kept[0].join("tools.git").join(".git").exists());
    }

    #[test]
    fn test_stale_scratch_from_earlier_run_is_swept() {
        let fx = Fixture::new();
        let handle = fx.bare("tools.git", &[("code.rs", "x")]);
        let stale = fx.config.scratch_root.join("tools.git.scratch-AbC123");
        let unrelated = fx.config.scratch_root.join("tools.git-extra.scratch-AbC123");
        fs::create_dir_all(stale.join("junk")).unwrap();
        fs::create_dir_all(&unrelated).unwrap();

        LicenseInjector::new(&fx.config).inject_if_missing(&handle).unwrap();

        assert!(!stale.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_append_readme_creates_and_appends() {
        let dir = TempDir::new().unwrap();
        let default = dir.path().join("default.md");
        let target = dir.path().join("README.md");
        fs::write(&default, "boilerplate\n").unwrap();

        append_readme(&default, &target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "boilerplate\n");

        append_readme(&default, &target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "boilerplate\nboilerplate\n");
    }
}

//! Local git operations for mirroring repositories.
//!
//! Everything shells out to the `git` executable. Credentials are handed to
//! git as an `http.extraHeader` through `GIT_CONFIG_*` environment variables,
//! so the PAT never appears in a remote URL, in argv or in `.git/config`.

use secrecy::{ExposeSecret, SecretString};
use std::{
    collections::BTreeMap,
    path::Path,
    process::{Command, Output},
};
use tracing::debug;

use crate::api::PatCredential;
use crate::error::GitError;

/// Ref name to object id.
pub type RefMap = BTreeMap<String, String>;

/// Refspecs pushed to the target: every branch and tag, forced.
///
/// Azure DevOps mirror clones also hold `refs/pull/*`, which the target
/// rejects, so the mirror is never pushed with `--mirror`.
const PUSH_REFSPECS: [&str; 2] = ["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"];

/// Authentication for git smart HTTP.
#[derive(Clone, Default)]
pub struct GitAuth {
    extra_header: Option<SecretString>,
}

impl GitAuth {
    /// No credentials, e.g. for local file remotes.
    pub fn none() -> Self {
        Self::default()
    }

    /// Basic authentication with a PAT.
    pub fn from_pat(pat: &SecretString) -> Self {
        Self {
            extra_header: Some(PatCredential::new(pat.clone()).git_extra_header()),
        }
    }

    fn apply(&self, command: &mut Command) {
        command.env("GIT_TERMINAL_PROMPT", "0");
        if let Some(header) = &self.extra_header {
            command
                .env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", "http.extraHeader")
                .env("GIT_CONFIG_VALUE_0", header.expose_secret());
        }
    }
}

impl std::fmt::Debug for GitAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitAuth")
            .field(
                "extra_header",
                &self.extra_header.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn git(auth: &GitAuth) -> Command {
    let mut command = Command::new("git");
    auth.apply(&mut command);
    command
}

fn run(mut command: Command, description: &str) -> Result<Output, GitError> {
    debug!(command = description, "Running git");
    command.output().map_err(|e| GitError::CommandFailed {
        command: description.to_string(),
        message: e.to_string(),
    })
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Clones every ref of `remote_url` into a bare mirror at `destination`.
pub fn mirror_clone(remote_url: &str, destination: &Path, auth: &GitAuth) -> Result<(), GitError> {
    let mut command = git(auth);
    command
        .args(["clone", "--mirror", "--quiet", remote_url])
        .arg(destination);

    let output = run(command, "git clone --mirror")?;
    if !output.status.success() {
        return Err(GitError::CloneFailed {
            message: stderr_of(&output),
        });
    }
    Ok(())
}

/// Lists branches and tags of a local repository.
pub fn list_local_refs(repo_path: &Path) -> Result<RefMap, GitError> {
    if !repo_path.exists() {
        return Err(GitError::NotARepository {
            path: repo_path.to_path_buf(),
        });
    }

    let mut command = Command::new("git");
    command.current_dir(repo_path).args([
        "for-each-ref",
        "--format=%(objectname) %(refname)",
        "refs/heads",
        "refs/tags",
    ]);

    let output = run(command, "git for-each-ref")?;
    if !output.status.success() {
        let message = stderr_of(&output);
        if message.contains("not a git repository") {
            return Err(GitError::NotARepository {
                path: repo_path.to_path_buf(),
            });
        }
        return Err(GitError::CommandFailed {
            command: "git for-each-ref".to_string(),
            message,
        });
    }

    Ok(parse_ref_listing(&String::from_utf8_lossy(&output.stdout)))
}

/// Force-pushes all branches and tags of the mirror to `remote_url`.
pub fn push_refs(repo_path: &Path, remote_url: &str, auth: &GitAuth) -> Result<(), GitError> {
    let mut command = git(auth);
    command
        .current_dir(repo_path)
        .args(["push", "--quiet", remote_url])
        .args(PUSH_REFSPECS);

    let output = run(command, "git push")?;
    if !output.status.success() {
        return Err(GitError::PushFailed {
            message: stderr_of(&output),
        });
    }
    Ok(())
}

/// Lists branches and tags of a remote with `git ls-remote`.
///
/// Peeled tag entries (`^{}`) are dropped so the result compares directly
/// with [`list_local_refs`].
pub fn list_remote_refs(remote_url: &str, auth: &GitAuth) -> Result<RefMap, GitError> {
    let mut command = git(auth);
    command.args(["ls-remote", "--heads", "--tags", remote_url]);

    let output = run(command, "git ls-remote")?;
    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: "git ls-remote".to_string(),
            message: stderr_of(&output),
        });
    }

    Ok(parse_ref_listing(&String::from_utf8_lossy(&output.stdout)))
}

/// Parses `<object id><whitespace><ref name>` lines.
pub fn parse_ref_listing(listing: &str) -> RefMap {
    listing
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let object_id = parts.next()?;
            let ref_name = parts.next()?;
            if ref_name.ends_with("^{}") {
                return None;
            }
            Some((ref_name.to_string(), object_id.to_string()))
        })
        .collect()
}

/// Checks that every local ref exists on the remote with the same object id.
///
/// Extra refs on the remote are ignored.
pub fn verify_pushed_refs(local: &RefMap, remote: &RefMap) -> Result<(), GitError> {
    let mismatched: Vec<String> = local
        .iter()
        .filter(|(name, object_id)| remote.get(*name) != Some(*object_id))
        .map(|(name, _)| name.clone())
        .collect();

    if mismatched.is_empty() {
        Ok(())
    } else {
        Err(GitError::VerificationFailed { mismatched })
    }
}

/// Lists the commits reachable from branches and tags, oldest first.
pub fn list_commits(repo_path: &Path) -> Result<Vec<String>, GitError> {
    let mut command = Command::new("git");
    command
        .current_dir(repo_path)
        .args(["rev-list", "--reverse", "--topo-order", "--branches", "--tags"]);

    let output = run(command, "git rev-list")?;
    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: "git rev-list".to_string(),
            message: stderr_of(&output),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect())
}

/// Creates an empty bare repository.
pub fn init_bare(path: &Path) -> Result<(), GitError> {
    let mut command = Command::new("git");
    command.args(["init", "--bare", "--quiet"]).arg(path);

    let output = run(command, "git init --bare")?;
    if !output.status.success() {
        return Err(GitError::CommandFailed {
            command: "git init --bare".to_string(),
            message: stderr_of(&output),
        });
    }
    Ok(())
}

/// Resolves a ref to its object id, `None` when it does not exist.
pub fn resolve_ref(repo_path: &Path, ref_name: &str) -> Result<Option<String>, GitError> {
    let mut command = Command::new("git");
    command
        .current_dir(repo_path)
        .args(["rev-parse", "--verify", "--quiet", ref_name]);

    let output = run(command, "git rev-parse")?;
    if output.status.success() {
        Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        ))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn git_in(repo_path: &Path, args: &[&str]) {
        let output = Command::new("git")
            .current_dir(repo_path)
            .args(args)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn setup_test_repo() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path().join("work");
        fs::create_dir(&repo_path).unwrap();

        git_in(&repo_path, &["init", "--quiet", "--initial-branch=main"]);
        git_in(&repo_path, &["config", "user.name", "Test User"]);
        git_in(&repo_path, &["config", "user.email", "test@example.com"]);

        (temp_dir, repo_path)
    }

    fn create_commit_with_message(repo_path: &Path, message: &str) {
        let content = format!("test content for: {}", message);
        fs::write(repo_path.join("test.txt"), content).unwrap();
        git_in(repo_path, &["add", "."]);
        git_in(repo_path, &["commit", "--quiet", "-m", message]);
    }

    /// # Ref Listing Parser
    ///
    /// Tests parsing for-each-ref and ls-remote output.
    ///
    /// ## Test Scenario
    /// - Parses space and tab separated listings with a peeled tag
    ///
    /// ## Expected Outcome
    /// - Peeled entries are dropped, other refs are mapped
    #[test]
    fn test_parse_ref_listing() {
        let listing = "aaa refs/heads/main\nbbb\trefs/tags/v1\nccc\trefs/tags/v1^{}\n\n";
        let refs = parse_ref_listing(listing);

        assert_eq!(refs.len(), 2);
        assert_eq!(refs.get("refs/heads/main").map(String::as_str), Some("aaa"));
        assert_eq!(refs.get("refs/tags/v1").map(String::as_str), Some("bbb"));
    }

    /// # Push Verification
    ///
    /// Tests comparing local and remote refs.
    ///
    /// ## Test Scenario
    /// - Remote matches, has extra refs, misses a ref, differs on a ref
    ///
    /// ## Expected Outcome
    /// - Only missing or different refs are reported
    #[test]
    fn test_verify_pushed_refs() {
        let local: RefMap = [
            ("refs/heads/main".to_string(), "aaa".to_string()),
            ("refs/tags/v1".to_string(), "bbb".to_string()),
        ]
        .into_iter()
        .collect();

        let mut remote = local.clone();
        remote.insert("refs/heads/extra".to_string(), "ccc".to_string());
        assert!(verify_pushed_refs(&local, &remote).is_ok());

        remote.remove("refs/tags/v1");
        remote.insert("refs/heads/main".to_string(), "zzz".to_string());
        match verify_pushed_refs(&local, &remote) {
            Err(GitError::VerificationFailed { mismatched }) => {
                assert_eq!(mismatched, vec!["refs/heads/main", "refs/tags/v1"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    /// # Mirror, Push and Verify
    ///
    /// Tests the full mirror flow between local repositories.
    ///
    /// ## Test Scenario
    /// - Source repo with 3 commits, a feature branch and a tag
    /// - Mirror-clone it, push to an empty bare repo, list remote refs
    ///
    /// ## Expected Outcome
    /// - Target refs equal the mirror's refs
    /// - Target holds the same 3 commits in the same order
    #[test]
    fn test_mirror_push_and_verify() {
        let (temp_dir, source) = setup_test_repo();
        create_commit_with_message(&source, "first");
        create_commit_with_message(&source, "second");
        git_in(&source, &["tag", "-a", "v1", "-m", "release 1"]);
        git_in(&source, &["branch", "feature"]);
        create_commit_with_message(&source, "third");

        let mirror = temp_dir.path().join("mirror.git");
        let target = temp_dir.path().join("target.git");
        init_bare(&target).unwrap();

        let auth = GitAuth::none();
        mirror_clone(source.to_str().unwrap(), &mirror, &auth).unwrap();
        let local = list_local_refs(&mirror).unwrap();
        assert!(local.contains_key("refs/heads/main"));
        assert!(local.contains_key("refs/heads/feature"));
        assert!(local.contains_key("refs/tags/v1"));

        push_refs(&mirror, target.to_str().unwrap(), &auth).unwrap();
        let remote = list_remote_refs(target.to_str().unwrap(), &auth).unwrap();
        verify_pushed_refs(&local, &remote).unwrap();

        let source_commits = list_commits(&source).unwrap();
        assert_eq!(source_commits.len(), 3);
        assert_eq!(list_commits(&target).unwrap(), source_commits);

        assert_eq!(
            resolve_ref(&target, "refs/heads/feature").unwrap(),
            local.get("refs/heads/feature").cloned()
        );
        assert_eq!(resolve_ref(&target, "refs/heads/missing").unwrap(), None);
    }

    /// # Empty Repository
    ///
    /// Tests mirroring a repository without commits.
    ///
    /// ## Test Scenario
    /// - Mirror-clones an empty bare repository
    ///
    /// ## Expected Outcome
    /// - The clone succeeds and has no refs
    #[test]
    fn test_mirror_empty_repository() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty.git");
        init_bare(&empty).unwrap();

        let mirror = temp_dir.path().join("mirror.git");
        mirror_clone(empty.to_str().unwrap(), &mirror, &GitAuth::none()).unwrap();
        assert!(list_local_refs(&mirror).unwrap().is_empty());
    }

    /// # Clone Failure
    ///
    /// Tests cloning from a path that is not a repository.
    ///
    /// ## Test Scenario
    /// - Mirror-clones a missing path
    ///
    /// ## Expected Outcome
    /// - GitError::CloneFailed with git's message
    #[test]
    fn test_mirror_clone_failure() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");
        let result = mirror_clone(
            missing.to_str().unwrap(),
            &temp_dir.path().join("mirror.git"),
            &GitAuth::none(),
        );
        assert!(matches!(result, Err(GitError::CloneFailed { .. })));
    }

    /// # Not A Repository
    ///
    /// Tests listing refs of a missing directory.
    ///
    /// ## Test Scenario
    /// - Lists refs of a path that does not exist
    ///
    /// ## Expected Outcome
    /// - GitError::NotARepository
    #[test]
    fn test_list_local_refs_not_a_repository() {
        let temp_dir = TempDir::new().unwrap();
        let result = list_local_refs(&temp_dir.path().join("nope"));
        assert!(matches!(result, Err(GitError::NotARepository { .. })));
    }

    /// # Auth Redaction
    ///
    /// Tests that git credentials never show in debug output.
    ///
    /// ## Test Scenario
    /// - Builds GitAuth from a PAT and formats it
    ///
    /// ## Expected Outcome
    /// - The header is redacted
    #[test]
    fn test_git_auth_debug_redacted() {
        let auth = GitAuth::from_pat(&SecretString::from("secret-pat".to_string()));
        let debug = format!("{:?}", auth);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret"));
        assert!(format!("{:?}", GitAuth::none()).contains("None"));
    }
}

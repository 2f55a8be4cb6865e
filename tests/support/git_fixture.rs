// ABOUTME: Builds throwaway git repositories on disk for fetch tests.

use git2::{IndexAddOption, Repository, Signature};
use std::path::Path;
use tempfile::TempDir;

/// A repository whose `main` branch holds `files` in a single commit.
pub fn repo_with_files(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_files(&repo, dir.path(), "main", files, "initial");
    repo.set_head("refs/heads/main").unwrap();
    dir
}

/// Commit `files` on top of `branch` (creating it if needed).
pub fn commit_files(repo: &Repository, root: &Path, branch: &str, files: &[(&str, &str)], message: &str) {
    for (path, content) in files {
        let file = root.join(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(file, content).unwrap();
    }

    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("cloudnest", "cloudnest@example.com").unwrap();

    let reference = format!("refs/heads/{branch}");
    let parent = repo
        .find_reference(&reference)
        .ok()
        .and_then(|r| r.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some(&reference), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

/// The URL git2 clones a fixture from.
pub fn url(dir: &TempDir) -> String {
    dir.path().to_string_lossy().into_owned()
}

//! Local repositories for exercising clone and pull without a network.

use git2::{Commit, Oid, Repository, Signature};
use std::fs;
use std::path::Path;

/// Creates a non-bare repository at `path` with a single commit of `README` = "v1".
pub(crate) fn init_origin(path: &Path) -> (Repository, Oid) {
    let repo = Repository::init(path).unwrap();
    let first = commit_file(&repo, "README", "v1", "initial");
    (repo, first)
}

pub(crate) fn url_of(path: &Path) -> String {
    path.display().to_string()
}

pub(crate) fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    fs::write(workdir.join(name), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    commit_index(repo, message)
}

pub(crate) fn commit_index(repo: &Repository, message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    index.read(false).unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = Signature::now("autopull", "autopull@example.test").unwrap();

    let parents: Vec<Commit> = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<&Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parent_refs)
        .unwrap()
}

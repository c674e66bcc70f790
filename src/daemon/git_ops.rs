use super::errors::{Result, UpdateError};
use super::repo_config::RepoCfg;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    Cred, CredentialType, Direction, ErrorCode, FetchOptions, Oid, Remote, RemoteCallbacks,
    Repository, SubmoduleUpdateOptions,
};
use log::{debug, info, warn};
use std::fmt;
use std::path::Path;

pub const REMOTE_NAME: &str = "origin";
/// How deep nested submodules are followed after a clone
pub const SUBMODULE_DEPTH: usize = 10;

/// What is on disk at the checkout folder. Derived fresh on every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
    Absent,
    BareDirectory,
    LinkedRepository,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Clone,
    Pull,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Clone => f.write_str("clone"),
            SyncAction::Pull => f.write_str("pull"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Cloned { head: Option<Oid> },
    UpToDate { head: Option<Oid> },
    FastForwarded { from: Option<Oid>, to: Oid, commits: usize },
}

impl SyncOutcome {
    pub fn head(&self) -> Option<Oid> {
        match self {
            SyncOutcome::Cloned { head } | SyncOutcome::UpToDate { head } => *head,
            SyncOutcome::FastForwarded { to, .. } => Some(*to),
        }
    }
}

#[derive(Debug)]
pub struct SyncReport {
    pub action: SyncAction,
    pub result: Result<SyncOutcome>,
}

impl SyncReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error_detail(&self) -> Option<String> {
        self.result.as_ref().err().map(ToString::to_string)
    }
}

pub fn classify(folder: &Path) -> CheckoutState {
    if !folder.exists() {
        CheckoutState::Absent
    } else if folder.join(".git").exists() {
        CheckoutState::LinkedRepository
    } else {
        CheckoutState::BareDirectory
    }
}

/// Brings `cfg.folder` up to date: pulls an existing checkout, clones otherwise.
///
/// A folder with git metadata is never cloned over, even when it cannot be opened.
pub fn sync(cfg: &RepoCfg) -> SyncReport {
    match classify(&cfg.folder) {
        CheckoutState::LinkedRepository => {
            info!("Updating {} with git pull", cfg.folder.display());
            SyncReport {
                action: SyncAction::Pull,
                result: pull(&cfg.folder),
            }
        }
        state => {
            info!(
                "Updating {} ({state:?}) with git clone from {}",
                cfg.folder.display(),
                cfg.gitrepo
            );
            SyncReport {
                action: SyncAction::Clone,
                result: clone(&cfg.gitrepo, &cfg.folder),
            }
        }
    }
}

pub fn pull(folder: &Path) -> Result<SyncOutcome> {
    debug!("Checking repo {} for updates", folder.display());

    let repository = Repository::open(folder).map_err(|source| UpdateError::OpenRepo {
        path: folder.display().to_string(),
        source,
    })?;

    let head = repository.head().ok();
    let branch = head
        .as_ref()
        .filter(|head| head.is_branch())
        .and_then(|head| head.shorthand())
        .map(str::to_owned);
    let local_head = head.as_ref().and_then(|head| head.target());

    let refspec = match &branch {
        Some(name) => format!("refs/heads/{name}"),
        None => "HEAD".to_string(),
    };

    let mut remote = repository.find_remote(REMOTE_NAME).map_err(transport_err)?;
    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(remote_callbacks());

    info!("Fetching '{refspec}' from {REMOTE_NAME} for {}", folder.display());
    remote
        .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
        .map_err(transport_err)?;

    let fetch_head = repository.find_reference("FETCH_HEAD")?;
    let fetch_commit = repository.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repository.merge_analysis(&[&fetch_commit])?;

    if analysis.is_up_to_date() {
        debug!("No changes detected for {}", folder.display());
        return Ok(SyncOutcome::UpToDate { head: local_head });
    }
    if !analysis.is_fast_forward() && !analysis.is_unborn() {
        return Err(UpdateError::NonFastForward {
            branch: branch.unwrap_or_else(|| "HEAD".to_string()),
        });
    }

    // Update the working tree first: a checkout refused over local changes must leave
    // the ref where it was so the next cycle tries again.
    let target = fetch_commit.id();
    let target_commit = repository.find_commit(target)?;
    repository
        .checkout_tree(target_commit.as_object(), Some(CheckoutBuilder::new().safe()))
        .map_err(|source| match source.code() {
            ErrorCode::Conflict | ErrorCode::Modified => UpdateError::DirtyWorktree {
                path: folder.display().to_string(),
                source,
            },
            _ => UpdateError::Git(source),
        })?;

    match &branch {
        Some(name) => {
            let refname = format!("refs/heads/{name}");
            let log_message = format!("autopull: fast-forward to {target}");
            repository.reference(&refname, target, true, &log_message)?;
            repository.set_head(&refname)?;
        }
        None => repository.set_head_detached(target)?,
    }

    let commits = count_commits(&repository, local_head, target)?;
    info!(
        "Fast-forwarded repo {} to {target} ({commits} new commit{})",
        folder.display(),
        if commits == 1 { "" } else { "s" }
    );
    log_head_commit(&repository, target);

    Ok(SyncOutcome::FastForwarded {
        from: local_head,
        to: target,
        commits,
    })
}

pub fn clone(url: &str, folder: &Path) -> Result<SyncOutcome> {
    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(remote_callbacks());

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);

    let repository = builder.clone(url, folder).map_err(|source| UpdateError::Clone {
        url: url.to_string(),
        source,
    })?;

    update_submodules(&repository, SUBMODULE_DEPTH)?;

    let head = repository.head().ok().and_then(|head| head.target());
    if let Some(head) = head {
        log_head_commit(&repository, head);
    }
    info!("Clone of {url} into {} completed", folder.display());
    Ok(SyncOutcome::Cloned { head })
}

/// Connects to `url` without cloning and returns the commit its `HEAD` points to.
pub fn probe_remote(url: &str) -> Result<Option<Oid>> {
    let mut remote = Remote::create_detached(url)?;
    let connection = remote
        .connect_auth(Direction::Fetch, Some(remote_callbacks()), None)
        .map_err(|source| UpdateError::Transport {
            remote: url.to_string(),
            source,
        })?;

    let head = connection
        .list()?
        .iter()
        .find(|remote_head| remote_head.name() == "HEAD")
        .map(|remote_head| remote_head.oid());
    Ok(head)
}

fn update_submodules(repository: &Repository, depth: usize) -> Result<()> {
    if depth == 0 {
        return Ok(());
    }

    for mut submodule in repository.submodules()? {
        let name = submodule.name().unwrap_or("<unnamed>").to_string();
        debug!("Updating submodule {name}");

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks());
        let mut update_options = SubmoduleUpdateOptions::new();
        update_options.fetch(fetch_options);
        submodule.update(true, Some(&mut update_options))?;

        let nested = submodule.open()?;
        update_submodules(&nested, depth - 1)?;
    }

    Ok(())
}

fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut credentials = TransportCredentials::default();
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed| {
        credentials.request(url, username_from_url, allowed)
    });
    callbacks
}

/// Credentials the transport can supply without prompting: the SSH agent for SSH
/// remotes, the configured credential helper for HTTPS. Each connection gets a single
/// real attempt, libgit2 would otherwise keep asking after a rejection. Username
/// lookups come before the key exchange and do not count.
#[derive(Debug, Default)]
struct TransportCredentials {
    attempted: bool,
}

impl TransportCredentials {
    fn request(
        &mut self,
        url: &str,
        username_from_url: Option<&str>,
        allowed: CredentialType,
    ) -> std::result::Result<Cred, git2::Error> {
        let username = username_from_url.unwrap_or("git");
        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(username);
        }

        if self.attempted {
            return Err(git2::Error::from_str(&format!(
                "authentication rejected for {url}"
            )));
        }
        self.attempted = true;

        if allowed.contains(CredentialType::SSH_KEY) {
            Cred::ssh_key_from_agent(username)
        } else if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()?;
            Cred::credential_helper(&config, url, username_from_url)
        } else if allowed.contains(CredentialType::DEFAULT) {
            Cred::default()
        } else {
            Err(git2::Error::from_str(&format!(
                "no usable credentials for {url}"
            )))
        }
    }
}

fn transport_err(source: git2::Error) -> UpdateError {
    UpdateError::Transport {
        remote: REMOTE_NAME.to_string(),
        source,
    }
}

fn count_commits(repository: &Repository, from: Option<Oid>, to: Oid) -> Result<usize> {
    let mut revwalk = repository.revwalk()?;
    revwalk.push(to)?;
    if let Some(from) = from {
        revwalk.hide(from)?;
    }
    Ok(revwalk.count())
}

fn log_head_commit(repository: &Repository, head: Oid) {
    match repository.find_commit(head) {
        Ok(commit) => info!(
            "HEAD is now {head} {}",
            commit.summary().unwrap_or_default()
        ),
        Err(error) => warn!("Could not read head commit {head}: {error}"),
    }
}

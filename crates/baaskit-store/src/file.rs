//! Session persisted as a JSON file

use crate::error::{StoreError, StoreResult};
use baaskit_core::{CoreResult, CredentialStore, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CredentialsFile {
    version: u32,
    saved_at: DateTime<Utc>,
    session: Session,
}

#[derive(Debug)]
enum WriterCommand {
    Persist(Session),
    Flush(oneshot::Sender<StoreResult<()>>),
}

/// Keeps the session in memory and mirrors every change to `path`
///
/// Reads are served from memory. `set` swaps the snapshot under the store lock and queues the
/// new session for a writer thread, so callers never wait on the disk. The writer applies
/// sessions in the order they were set, each through a sibling temp file renamed over the
/// target, so the file always holds a complete session. Await [`flush`](Self::flush) before
/// exiting to make sure the last change reached the disk.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    session: Mutex<Session>,
    writer: mpsc::UnboundedSender<WriterCommand>,
}

impl FileCredentialStore {
    /// Load `path` if it exists; a missing file means no session
    pub fn open(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        let session = load(&path)?;
        debug!(path = %path.display(), authenticated = session.is_authenticated(), "credentials loaded");

        let (writer, commands) = mpsc::unbounded_channel();
        let writer_path = path.clone();
        thread::Builder::new()
            .name("baaskit-credentials".to_string())
            .spawn(move || run_writer(writer_path, commands))
            .map_err(StoreError::from)?;

        Ok(Self { path, session: Mutex::new(session), writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until every queued change is on disk
    ///
    /// Returns the first write error seen since the previous flush.
    pub async fn flush(&self) -> StoreResult<()> {
        let (tx, rx) = oneshot::channel();
        self.writer.send(WriterCommand::Flush(tx)).map_err(|_| StoreError::WriterStopped)?;
        rx.await.map_err(|_| StoreError::WriterStopped)?
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Session {
        self.session.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, session: Session) -> CoreResult<()> {
        session.validate()?;
        let mut current = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        *current = session;
        // Queued while still holding the lock so the file follows the order of `set` calls
        self.writer
            .send(WriterCommand::Persist(current.clone()))
            .map_err(|_| StoreError::WriterStopped)?;
        debug!(path = %self.path.display(), authenticated = current.is_authenticated(), "credentials queued");
        Ok(())
    }
}

fn load(path: &Path) -> StoreResult<Session> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Session::empty()),
        Err(e) => return Err(e.into()),
    };
    let file: CredentialsFile = serde_json::from_str(&content)?;
    if file.version != FILE_VERSION {
        return Err(StoreError::UnsupportedVersion(file.version));
    }
    file.session.validate()?;
    Ok(file.session)
}

fn persist(path: &Path, session: &Session) -> StoreResult<()> {
    if !session.is_authenticated() {
        return match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        };
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = CredentialsFile {
        version: FILE_VERSION,
        saved_at: Utc::now(),
        session: session.clone(),
    };
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(&file)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Drains commands until every store handle is gone
fn run_writer(path: PathBuf, mut commands: mpsc::UnboundedReceiver<WriterCommand>) {
    let mut failed: Option<StoreError> = None;
    while let Some(command) = commands.blocking_recv() {
        match command {
            WriterCommand::Persist(session) => match persist(&path, &session) {
                Ok(()) => {
                    info!(path = %path.display(), authenticated = session.is_authenticated(), "credentials saved");
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "failed to write credentials");
                    failed.get_or_insert(error);
                }
            },
            WriterCommand::Flush(reply) => {
                let _ = reply.send(failed.take().map_or(Ok(()), Err));
            }
        }
    }
    debug!(path = %path.display(), "credentials writer stopped");
}

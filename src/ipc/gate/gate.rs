/*!
 * Mutual-Exclusion Gate
 *
 * A single-token lock shared by every worker process, keyed by a lock-file
 * path. Built on `flock(LOCK_EX)`:
 * - the lock belongs to an open file description, so each acquire opens the
 *   key afresh and a second acquire in the same process blocks (not reentrant)
 * - the kernel drops the lock when the holder's descriptor closes, including
 *   when the holder dies from a signal, so a crashed holder never wedges the
 *   gate
 * - waiters are woken in no particular order
 */

use super::types::GateError;
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Handle on the gate key. Cheap to clone; holds no lock by itself.
#[derive(Debug, Clone)]
pub struct Gate {
    path: PathBuf,
}

impl Gate {
    /// Open the gate, creating its key if this is the first reference
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, GateError> {
        let path = path.into();
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o666)
            .open(&path)
            .map_err(|source| GateError::Open {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "Opened gate");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_description(&self) -> Result<File, GateError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => GateError::Missing(self.path.clone()),
                _ => GateError::Open {
                    path: self.path.clone(),
                    source,
                },
            })
    }

    /// Block until the token is free and take it
    pub fn acquire(&self) -> Result<GateGuard, GateError> {
        let mut file = self.open_description()?;
        loop {
            match Flock::lock(file, FlockArg::LockExclusive) {
                Ok(lock) => {
                    trace!(path = %self.path.display(), "Gate acquired");
                    return Ok(GateGuard {
                        lock: Some(lock),
                        path: self.path.clone(),
                    });
                }
                // Interrupted by a handled signal; retry with the same description
                Err((returned, Errno::EINTR)) => file = returned,
                Err((_, errno)) => {
                    return Err(GateError::Acquire {
                        path: self.path.clone(),
                        source: errno.into(),
                    })
                }
            }
        }
    }

    /// Take the token only if it is free right now
    pub fn try_acquire(&self) -> Result<Option<GateGuard>, GateError> {
        let file = self.open_description()?;
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => Ok(Some(GateGuard {
                lock: Some(lock),
                path: self.path.clone(),
            })),
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(None),
            Err((_, errno)) => Err(GateError::Acquire {
                path: self.path.clone(),
                source: errno.into(),
            }),
        }
    }
}

/// Proof of holding the gate. Dropping it releases the token; `release`
/// does the same but reports failures.
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct GateGuard {
    lock: Option<Flock<File>>,
    path: PathBuf,
}

impl GateGuard {
    pub fn release(mut self) -> Result<(), GateError> {
        let Some(lock) = self.lock.take() else {
            return Ok(());
        };
        match lock.unlock() {
            Ok(_file) => {
                trace!(path = %self.path.display(), "Gate released");
                Ok(())
            }
            // Closing the descriptor still drops the lock
            Err((lock, errno)) => {
                drop(lock);
                Err(GateError::Release {
                    path: self.path.clone(),
                    source: errno.into(),
                })
            }
        }
    }
}

impl std::fmt::Debug for GateGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateGuard")
            .field("path", &self.path)
            .field("held", &self.lock.is_some())
            .finish()
    }
}

use std::fs;
use std::io::{ErrorKind, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::ObserverError;

pub const SOCKET_NAME: &str = "generation.sock";
pub const MARKER: &[u8] = b"newdata";

/// a viewer that stops reading is dropped once a write blocks this long
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(200);
/// how often the accept thread checks for shutdown
const ACCEPT_POLL: Duration = Duration::from_millis(20);

type Slot = Arc<Mutex<Option<UnixStream>>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<UnixStream>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// tells a local viewer that new statistics are available.
///
/// a named thread keeps accepting on the socket; the most recent client wins.
/// a failed or timed out write drops that client, the listener stays up for the next one.
pub struct Notifier {
    path: PathBuf,
    client: Slot,
    accepted: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl Notifier {
    pub fn bind(dir: &Path) -> Result<Self, ObserverError> {
        let path = dir.join(SOCKET_NAME);
        let io_err = |source| ObserverError::Io { path: path.clone(), source };

        // stale socket from an earlier run
        if path.exists() {
            fs::remove_file(&path).map_err(io_err)?;
        }
        let listener = UnixListener::bind(&path).map_err(io_err)?;
        listener.set_nonblocking(true).map_err(io_err)?;

        let client: Slot = Arc::new(Mutex::new(None));
        let accepted = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let client = Arc::clone(&client);
            let accepted = Arc::clone(&accepted);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("notifier".to_owned())
                .spawn(move || accept_loop(listener, client, accepted, shutdown))
                .map_err(io_err)?
        };

        info!(path = %path.display(), "listening for viewers");
        Ok(Self { path, client, accepted, shutdown, accept_thread: Some(handle) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.client).is_some()
    }

    /// connections accepted so far
    pub fn accepted_count(&self) -> usize {
        self.accepted.load(Ordering::Acquire)
    }

    /// write the marker to the current client, if any. returns whether it was delivered.
    pub fn notify(&self) -> bool {
        let mut slot = lock(&self.client);
        let Some(stream) = slot.as_mut() else {
            return false;
        };
        match stream.write_all(MARKER) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "couldn't write to socket, dropping client");
                *slot = None;
                false
            }
        }
    }
}

/// blocking writes bounded by `WRITE_TIMEOUT`
fn prepare_client(stream: &UnixStream) -> std::io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_write_timeout(Some(WRITE_TIMEOUT))
}

// the listener is non-blocking so shutdown never depends on the socket file still existing
fn accept_loop(listener: UnixListener, client: Slot, accepted: Arc<AtomicUsize>, shutdown: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(e) = prepare_client(&stream) {
                    warn!(error = %e, "can't configure socket connection, ignoring it");
                    continue;
                }
                debug!("accepted socket connection");
                *lock(&client) = Some(stream);
                accepted.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                warn!(error = %e, "error accepting socket connection");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
        let _ = fs::remove_file(&self.path);
    }
}

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use devconsole_logs::{HelperLoader, LoadError, LoadOutcome};

/// Resolves helper libraries to files on disk and reports completion on a
/// channel
pub struct FsLoader {
    /// Library name to file path
    libraries: HashMap<String, PathBuf>,

    /// Completion channel
    tx: mpsc::UnboundedSender<LoadOutcome>,

    /// Cancels loads still running at shutdown
    cancel: CancellationToken,

    /// Loads requested but not yet reported back
    in_flight: Arc<AtomicUsize>,
}

impl FsLoader {
    pub fn new(
        libraries: HashMap<String, PathBuf>,
        tx: mpsc::UnboundedSender<LoadOutcome>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            libraries,
            tx,
            cancel,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of outstanding loads; the receiver decrements it
    pub fn in_flight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.in_flight)
    }
}

impl HelperLoader for FsLoader {
    fn load(&mut self, name: &str) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        let Some(path) = self.libraries.get(name).cloned() else {
            let error = LoadError::UnknownLibrary(name.to_string());
            let _ = self.tx.send(LoadOutcome::failed(name, error));
            return;
        };

        let tx = self.tx.clone();
        let cancel = self.cancel.clone();
        let name = name.to_string();

        tokio::spawn(async move {
            debug!(%name, path = %path.display(), "resolving helper library");
            let result = tokio::select! {
                _ = cancel.cancelled() => Err(LoadError::Cancelled),
                meta = tokio::fs::metadata(&path) => match meta {
                    Ok(meta) if meta.is_file() => Ok(()),
                    _ => Err(LoadError::NotFound(path.display().to_string())),
                },
            };
            let _ = tx.send(LoadOutcome { name, result });
        });
    }
}

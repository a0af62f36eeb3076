//! Delegated Proving Service
//!
//! Runs a [`ProvingManager`] on a dedicated worker thread so proving never
//! blocks the async runtime.
//!
//! ```text
//! caller task ──► gate (mutex) ──► mpsc(1) ──► worker thread ──► oneshot
//! ```
//!
//! The gate admits one request at a time; every other caller waits rather
//! than failing, so concurrent submissions serialize in arrival order. The
//! worker owns the manager and lives for the life of the service.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};

use crate::error::ProveError;
use crate::manager::{ProofInput, ProofOutput, ProvingManager};

struct ProveRequest {
    input: ProofInput,
    reply: oneshot::Sender<Result<ProofOutput, ProveError>>,
}

/// Handle to a background proving worker
///
/// Cheap to clone; all clones share the same worker and the same
/// single-request gate.
#[derive(Clone)]
pub struct ProvingService {
    request_tx: mpsc::Sender<ProveRequest>,
    gate: Arc<Mutex<()>>,
}

impl ProvingService {
    /// Start the worker thread and hand back its handle
    ///
    /// Proving is CPU-bound, so the worker is a plain OS thread outside the
    /// tokio runtime.
    pub fn start(manager: ProvingManager) -> Self {
        let (request_tx, mut request_rx) = mpsc::channel::<ProveRequest>(1);

        std::thread::spawn(move || {
            while let Some(request) = request_rx.blocking_recv() {
                let result = manager.prove(request.input);
                let _ = request.reply.send(result);
            }
            log::debug!("proving worker shutting down");
        });

        Self {
            request_tx,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Submit a request and wait for its proof
    ///
    /// At most one request is in flight at a time; later callers queue on
    /// the gate.
    pub async fn prove(&self, input: ProofInput) -> Result<ProofOutput, ProveError> {
        let _permit = self.gate.lock().await;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(ProveRequest {
                input,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProveError::WorkerGone)?;

        reply_rx.await.map_err(|_| ProveError::WorkerGone)?
    }
}

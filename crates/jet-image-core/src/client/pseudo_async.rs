//! Client backed by a dedicated inference worker thread
//!
//! ```text
//! [Event loop] --Job--> (crossbeam channel) --> [Worker thread: backend]
//!      ^                                               |
//!      +---------------- oneshot reply ----------------+
//! ```
//!
//! The worker owns the backend for its whole lifetime, so the backend never
//! has to be shared. The channel holds a single job and is never waited on:
//! a batch submitted while the slot is still taken by a job abandoned after a
//! timeout fails with `WorkerBusy` instead of blocking the event loop.

use super::{ClientConfig, ClientError, ClientMode, ClientState, InferenceBackend, InferenceClient};
use async_trait::async_trait;
use crossbeam_channel::{bounded, Sender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, info};

type Reply = Result<Vec<f32>, ClientError>;

struct Job {
    input: Vec<f32>,
    state: ClientState,
    reply: oneshot::Sender<Reply>,
}

/// Hands each batch to a worker thread and awaits the reply
pub struct PseudoAsyncClient {
    state: ClientState,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl PseudoAsyncClient {
    /// Start the worker thread; it takes ownership of `backend`
    ///
    /// # Errors
    /// Returns `WorkerSpawn` if the thread cannot be started
    pub fn new<B: InferenceBackend>(
        name: impl Into<String>,
        config: &ClientConfig,
        backend: B,
    ) -> Result<Self, ClientError> {
        let state = ClientState::new(name, config);
        let (jobs, job_rx) = bounded::<Job>(1);

        let worker = thread::Builder::new()
            .name(format!("{}-worker", state.name()))
            .spawn(move || {
                let mut backend = backend;
                for job in job_rx {
                    let result = job.state.run_with_retries(&mut backend, &job.input);
                    // The caller may have timed out and dropped the receiver
                    let _ = job.reply.send(result);
                }
            })?;

        debug!("{}: inference worker started", state.name());

        Ok(Self {
            state,
            jobs: Some(jobs),
            worker: Some(worker),
        })
    }
}

#[async_trait]
impl InferenceClient for PseudoAsyncClient {
    fn state(&self) -> &ClientState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ClientState {
        &mut self.state
    }

    fn mode(&self) -> ClientMode {
        ClientMode::PseudoAsync
    }

    async fn evaluate(&mut self, input: Vec<f32>) -> Result<Vec<f32>, ClientError> {
        self.state.check_input(&input)?;
        if self.state.batch_size() == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let jobs = self.jobs.as_ref().ok_or(ClientError::WorkerDisconnected)?;
        let (reply, reply_rx) = oneshot::channel();
        jobs.try_send(Job {
            input,
            state: self.state.clone(),
            reply,
        })
        .map_err(|e| match e {
            TrySendError::Full(_) => ClientError::WorkerBusy,
            TrySendError::Disconnected(_) => ClientError::WorkerDisconnected,
        })?;

        let received = match self.state.timeout() {
            Some(limit) => tokio::time::timeout(limit, reply_rx)
                .await
                .map_err(|_| ClientError::Timeout(limit))?,
            None => reply_rx.await,
        };
        let output = received.map_err(|_| ClientError::WorkerDisconnected)??;

        if self.state.verbose() {
            info!(
                "{}: evaluated batch of {} in {:?}",
                self.state.name(),
                self.state.batch_size(),
                start.elapsed()
            );
        }
        Ok(output)
    }
}

impl Drop for PseudoAsyncClient {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("{}: inference worker panicked", self.state.name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_pseudo_async_evaluate() {
        let config = ClientConfig::new("model.onnx", 2, 2);
        let backend = |input: &[f32], _batch: usize| -> Result<Vec<f32>, ClientError> {
            Ok(input.iter().rev().copied().collect())
        };
        let mut client = PseudoAsyncClient::new("pseudo", &config, backend).unwrap();
        client.set_batch_size(1).unwrap();

        assert_eq!(client.evaluate(vec![1.0, 2.0]).await.unwrap(), vec![2.0, 1.0]);
        client.set_batch_size(2).unwrap();
        assert_eq!(
            client.evaluate(vec![1.0, 2.0, 3.0, 4.0]).await.unwrap(),
            vec![4.0, 3.0, 2.0, 1.0]
        );
        assert_eq!(client.mode(), ClientMode::PseudoAsync);
    }

    #[tokio::test]
    async fn test_backend_runs_on_worker_thread() {
        let config = ClientConfig::new("model.onnx", 1, 1);
        let backend = |_: &[f32], batch: usize| -> Result<Vec<f32>, ClientError> {
            let name = thread::current().name().unwrap_or_default().to_string();
            if name == "jets-worker" {
                Ok(vec![1.0; batch])
            } else {
                Err(ClientError::Inference(format!("ran on {:?}", name)))
            }
        };
        let mut client = PseudoAsyncClient::new("jets", &config, backend).unwrap();
        client.set_batch_size(1).unwrap();
        assert_eq!(client.evaluate(vec![0.0]).await.unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn test_retries_on_worker() {
        let mut config = ClientConfig::new("model.onnx", 1, 1);
        config.allowed_tries = 2;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let backend = move |_: &[f32], batch: usize| -> Result<Vec<f32>, ClientError> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ClientError::Inference("transient".to_string()))
            } else {
                Ok(vec![0.5; batch])
            }
        };
        let mut client = PseudoAsyncClient::new("pseudo", &config, backend).unwrap();
        client.set_batch_size(1).unwrap();

        assert_eq!(client.evaluate(vec![0.0]).await.unwrap(), vec![0.5]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_jobs_do_not_block_submit() {
        let mut config = ClientConfig::new("model.onnx", 1, 1);
        config.timeout_secs = 1;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let backend = move |_: &[f32], batch: usize| -> Result<Vec<f32>, ClientError> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                thread::sleep(std::time::Duration::from_secs(3));
            }
            Ok(vec![0.0; batch])
        };
        let mut client = PseudoAsyncClient::new("pseudo", &config, backend).unwrap();
        client.set_batch_size(1).unwrap();

        // First job occupies the worker, second one waits in the channel
        for _ in 0..2 {
            assert!(matches!(
                client.evaluate(vec![0.0]).await,
                Err(ClientError::Timeout(_))
            ));
        }

        let start = Instant::now();
        let err = client.evaluate(vec![0.0]).await.unwrap_err();
        assert!(matches!(err, ClientError::WorkerBusy));
        assert!(start.elapsed() < std::time::Duration::from_millis(500));
    }

    #[test]
    fn test_drop_joins_worker() {
        let config = ClientConfig::new("model.onnx", 1, 1);
        let backend = |_: &[f32], batch: usize| -> Result<Vec<f32>, ClientError> { Ok(vec![0.0; batch]) };
        let client = PseudoAsyncClient::new("pseudo", &config, backend).unwrap();
        drop(client);
    }
}

//! Client that runs inference on the tokio blocking pool

use super::{ClientConfig, ClientError, ClientMode, ClientState, InferenceBackend, InferenceClient};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::info;

/// Offloads each call with `spawn_blocking` and awaits it with the configured timeout
///
/// A timed-out call keeps running on the blocking pool and holds the backend
/// until it finishes; the next call waits for it.
pub struct AsyncClient<B: InferenceBackend> {
    state: ClientState,
    backend: Arc<Mutex<B>>,
}

impl<B: InferenceBackend> AsyncClient<B> {
    #[must_use]
    pub fn new(name: impl Into<String>, config: &ClientConfig, backend: B) -> Self {
        Self {
            state: ClientState::new(name, config),
            backend: Arc::new(Mutex::new(backend)),
        }
    }
}

#[async_trait]
impl<B: InferenceBackend> InferenceClient for AsyncClient<B> {
    fn state(&self) -> &ClientState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ClientState {
        &mut self.state
    }

    fn mode(&self) -> ClientMode {
        ClientMode::Async
    }

    async fn evaluate(&mut self, input: Vec<f32>) -> Result<Vec<f32>, ClientError> {
        self.state.check_input(&input)?;
        if self.state.batch_size() == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let backend = Arc::clone(&self.backend);
        let state = self.state.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut backend = backend
                .lock()
                .map_err(|_| ClientError::Inference("inference backend poisoned".to_string()))?;
            state.run_with_retries(&mut *backend, &input)
        });

        let joined = match self.state.timeout() {
            Some(limit) => tokio::time::timeout(limit, task)
                .await
                .map_err(|_| ClientError::Timeout(limit))?,
            None => task.await,
        };
        let output =
            joined.map_err(|e| ClientError::Inference(format!("inference task failed: {}", e)))??;

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

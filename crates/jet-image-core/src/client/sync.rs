//! Client that runs inference on the calling task

use super::{ClientConfig, ClientError, ClientMode, ClientState, InferenceBackend, InferenceClient};
use async_trait::async_trait;
use std::time::Instant;
use tracing::info;

/// Runs the backend inline; the event loop blocks for the duration of the call
pub struct SyncClient<B: InferenceBackend> {
    state: ClientState,
    backend: B,
}

impl<B: InferenceBackend> SyncClient<B> {
    #[must_use]
    pub fn new(name: impl Into<String>, config: &ClientConfig, backend: B) -> Self {
        Self {
            state: ClientState::new(name, config),
            backend,
        }
    }

    /// Blocking evaluation, usable outside of an async context
    ///
    /// # Errors
    /// Returns error on a size mismatch or when every attempt fails
    pub fn evaluate_blocking(&mut self, input: &[f32]) -> Result<Vec<f32>, ClientError> {
        self.state.check_input(input)?;
        if self.state.batch_size() == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let output = self.state.run_with_retries(&mut self.backend, input)?;
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

#[async_trait]
impl<B: InferenceBackend> InferenceClient for SyncClient<B> {
    fn state(&self) -> &ClientState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ClientState {
        &mut self.state
    }

    fn mode(&self) -> ClientMode {
        ClientMode::Sync
    }

    async fn evaluate(&mut self, input: Vec<f32>) -> Result<Vec<f32>, ClientError> {
        self.evaluate_blocking(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling(input: &[f32], _batch: usize) -> Result<Vec<f32>, ClientError> {
        Ok(input.iter().map(|v| v * 2.0).collect())
    }

    #[test]
    fn test_sync_evaluate_blocking() {
        let config = ClientConfig::new("model.onnx", 2, 2);
        let mut client = SyncClient::new("sync", &config, doubling);
        client.set_batch_size(2).unwrap();

        let output = client.evaluate_blocking(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(output, vec![2.0, 4.0, 6.0, 8.0]);
        assert_eq!(client.mode(), ClientMode::Sync);
        assert_eq!(client.name(), "sync");
    }

    #[test]
    fn test_empty_batch_skips_backend() {
        let config = ClientConfig::new("model.onnx", 2, 2);
        let backend = |_: &[f32], _: usize| -> Result<Vec<f32>, ClientError> {
            Err(ClientError::Inference("must not be called".to_string()))
        };
        let mut client = SyncClient::new("sync", &config, backend);
        client.set_batch_size(0).unwrap();
        assert!(client.evaluate_blocking(&[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_through_trait() {
        let config = ClientConfig::new("model.onnx", 1, 1);
        let mut client = SyncClient::new("sync", &config, doubling);
        client.set_batch_size(3).unwrap();
        let output = client.evaluate(vec![0.5, 1.0, 1.5]).await.unwrap();
        assert_eq!(output, vec![1.0, 2.0, 3.0]);
    }
}

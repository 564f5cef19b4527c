//! Mock agent provider for testing.
//!
//! Returns canned transcripts and tracks invocations so loop tests can run
//! without a real agent CLI.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{AccessMode, AgentProvider, ModelClass};

/// A mock agent provider.
///
/// Cycles through its responses if invoked more times than configured.
#[derive(Debug, Clone)]
pub(crate) struct MockProvider {
    responses: Arc<Vec<String>>,
    invocation_count: Arc<AtomicUsize>,
    /// Model classes seen, in invocation order.
    seen_models: Arc<std::sync::Mutex<Vec<ModelClass>>>,
}

impl MockProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(responses),
            invocation_count: Arc::new(AtomicUsize::new(0)),
            seen_models: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// A mock that always returns the same transcript.
    pub fn always(output: &str) -> Self {
        Self::new(vec![output.to_string()])
    }

    pub fn invocation_count(&self) -> usize {
        self.invocation_count.load(Ordering::SeqCst)
    }

    pub fn seen_models(&self) -> Vec<ModelClass> {
        self.seen_models.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentProvider for MockProvider {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn invoke(
        &self,
        _project_dir: &Path,
        _prompt: &str,
        model: ModelClass,
        _access: AccessMode,
    ) -> Result<String> {
        let count = self.invocation_count.fetch_add(1, Ordering::SeqCst);
        self.seen_models.lock().unwrap().push(model);
        Ok(self.responses[count % self.responses.len()].clone())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_cycles_responses() {
        let provider = MockProvider::new(vec!["first".to_string(), "second".to_string()]);

        let r1 = provider
            .invoke(Path::new("/tmp"), "", ModelClass::Primary, AccessMode::ReadOnly)
            .await
            .unwrap();
        let r2 = provider
            .invoke(Path::new("/tmp"), "", ModelClass::Primary, AccessMode::ReadOnly)
            .await
            .unwrap();
        let r3 = provider
            .invoke(Path::new("/tmp"), "", ModelClass::Primary, AccessMode::ReadOnly)
            .await
            .unwrap();

        assert_eq!(r1, "first");
        assert_eq!(r2, "second");
        assert_eq!(r3, "first");
        assert_eq!(provider.invocation_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_records_model_classes() {
        let provider = MockProvider::always("ok");
        let _ = provider
            .invoke(Path::new("/tmp"), "", ModelClass::Deep, AccessMode::WriteEnabled)
            .await;
        assert_eq!(provider.seen_models(), vec![ModelClass::Deep]);
    }
}

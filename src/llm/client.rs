//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless completion service client
///
/// Each call is independent: the engine owns the conversation and sends the
/// whole (possibly truncated) message list every iteration. Exact
/// tokenization is the service's concern; the engine only estimates.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Scripted client for tests (also used by integration tests, so not
/// compiled out of the library)
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use tracing::debug;

    /// One scripted turn for the mock client
    pub enum MockTurn {
        Respond(CompletionResponse),
        Fail(LlmError),
    }

    /// Mock LLM client for unit tests
    ///
    /// Plays back a fixed script of responses/errors in order.
    pub struct MockLlmClient {
        turns: Mutex<Vec<MockTurn>>,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(turns: Vec<MockTurn>) -> Self {
            debug!(turn_count = turns.len(), "MockLlmClient::new: called");
            Self {
                turns: Mutex::new(turns),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Build a client from plain responses
        pub fn respond_with(responses: Vec<CompletionResponse>) -> Self {
            Self::new(responses.into_iter().map(MockTurn::Respond).collect())
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Requests seen so far (for asserting on conversation contents)
        pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.calls.lock().unwrap().push(request);

            let mut turns = self.turns.lock().unwrap();
            if turns.is_empty() {
                debug!("MockLlmClient::complete: script exhausted");
                return Err(LlmError::InvalidResponse("No more mock responses".to_string()));
            }
            match turns.remove(0) {
                MockTurn::Respond(response) => Ok(response),
                MockTurn::Fail(err) => Err(err),
            }
        }
    }

}

//! The external agent invocation surface: a single black-box RPC returning
//! text and an exit code. Process spawning itself is out of scope — this
//! is the interface the turn engine calls against.

use async_trait::async_trait;

use crate::error::Result;

/// One agent invocation's raw result.
#[derive(Debug, Clone)]
pub struct AgentInvocation {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub elapsed_ms: u64,
}

impl AgentInvocation {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// A `FATAL:` marker at the start of any stderr line makes a non-zero
    /// exit non-retryable.
    pub fn is_fatal(&self) -> bool {
        self.stderr.lines().any(|l| l.starts_with("FATAL:"))
    }

    pub fn is_retryable_failure(&self) -> bool {
        !self.is_success() && !self.is_fatal()
    }
}

#[async_trait]
pub trait Agent: Send + Sync {
    async fn invoke(&self, agent_name: &str, prompt: &str) -> Result<AgentInvocation>;
}

/// Test double: returns a fixed sequence of canned invocations, one per
/// call, looping on the last entry once exhausted.
pub struct ScriptedAgent {
    responses: tokio::sync::Mutex<Vec<AgentInvocation>>,
    calls: std::sync::atomic::AtomicUsize,
}

impl ScriptedAgent {
    pub fn new(responses: Vec<AgentInvocation>) -> Self {
        Self {
            responses: tokio::sync::Mutex::new(responses),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn invoke(&self, _agent_name: &str, _prompt: &str) -> Result<AgentInvocation> {
        let index = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let responses = self.responses.lock().await;
        let response = responses
            .get(index)
            .or_else(|| responses.last())
            .cloned()
            .expect("ScriptedAgent requires at least one canned response");
        Ok(response)
    }
}

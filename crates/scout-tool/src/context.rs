use scout_core::ToolContext;
use tokio_util::sync::CancellationToken;

/// Default implementation of ToolContext
#[derive(Debug, Clone)]
pub struct DefaultToolContext {
    function_call_id: String,
    invocation_id: String,
    cancellation: CancellationToken,
}

impl DefaultToolContext {
    pub fn new(function_call_id: String, invocation_id: String) -> Self {
        Self {
            function_call_id,
            invocation_id,
            cancellation: CancellationToken::new(),
        }
    }

    /// Context with freshly generated call and invocation ids
    pub fn generated() -> Self {
        Self::new(
            format!("call-{}", uuid::Uuid::new_v4()),
            format!("inv-{}", uuid::Uuid::new_v4()),
        )
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

impl ToolContext for DefaultToolContext {
    fn function_call_id(&self) -> &str {
        &self.function_call_id
    }

    fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

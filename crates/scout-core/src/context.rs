use tokio_util::sync::CancellationToken;

/// Tool context provided during tool execution
pub trait ToolContext: Send + Sync {
    fn function_call_id(&self) -> &str;
    fn invocation_id(&self) -> &str;

    /// Token observed by long-running tools (crawl polling, batch fetches).
    fn cancellation_token(&self) -> CancellationToken {
        CancellationToken::new()
    }
}

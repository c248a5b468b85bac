//! Port for the external model capability
//!
//! The engine treats the AI model as an opaque capability: it sends a
//! prompt, awaits a text result, and never depends on how the answer was
//! produced. Implementations must enforce their own call timeout and
//! surface unreachability as `Unavailable`.

use async_trait::async_trait;
use tides_domain::Result;

/// Opaque completion capability backing the assist services.
#[async_trait]
pub trait ModelPort: Send + Sync {
    /// Produce a completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

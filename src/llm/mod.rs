mod message;
mod providers;

pub use message::*;
pub use providers::deepseek::DeepSeekProvider;
pub use providers::{Completion, CompletionProvider, CompletionRequest, UpstreamError};

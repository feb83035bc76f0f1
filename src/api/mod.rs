mod huggingface;
mod qwen;

pub use huggingface::HuggingFaceClient;
pub use qwen::{QwenClient, DEFAULT_MAX_ATTEMPTS, DEFAULT_MODEL};

//! LLM collaborator implementations.

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "openai")]
pub use openai::OpenAiAnalyzer;

#[cfg(feature = "gemini")]
pub use gemini::GeminiSearcher;

/// AI Provider Gateway: the single point of entry for all generative-AI calls.
///
/// ARCHITECTURAL RULE: No feature module may call the AI provider directly.
/// Features build a `Prompt` and a `ShapeContract` and hand both to `Gateway`.
///
/// Flow: pool.acquire() → provider.call() → extract() → classify() on failure
///       → rotate / back off / stop (see `executor`).
pub mod classifier;
pub mod executor;
pub mod extractor;
pub mod gemini;
pub mod pool;
pub mod prompts;
pub mod provider;

pub use executor::{Gateway, GatewayError, LogicalRequest};
pub use extractor::ShapeContract;
pub use provider::{GenerationSettings, InlineImage, Prompt};

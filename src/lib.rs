pub mod config;
pub mod fetcher;
pub mod llm_adapter;
pub mod parser;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod types;

pub use config::Config;
pub use fetcher::Fetcher;
pub use llm_adapter::{AnthropicAdapter, LlmAdapter, OpenAiAdapter, ProviderRegistry};
pub use pipeline::{IngestionPipeline, RunSummary};
pub use sources::{NewsSource, UdnSource};
pub use store::{ArticleStore, SqliteStore};
pub use types::*;

pub mod llm_client;
pub mod research_client;

pub use llm_client::{OpenAiTextModel, TextModel};
pub use research_client::{
    build_sources, clean_query, BritannicaClient, LookupResult, ResearchSource, WikipediaClient,
};

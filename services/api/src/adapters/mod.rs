pub mod analysis_llm;
pub mod store;

pub use analysis_llm::OpenAiAnalysisAdapter;
pub use store::JsonStoreAdapter;

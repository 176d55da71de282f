pub mod content_generator;
pub mod document_builder;
pub mod evidence_filter;
pub mod evidence_retriever;
pub mod fact_checker;
pub mod quiz_service;
pub mod relevance;
pub mod slide_builder;
pub mod unit_planner;

pub use content_generator::{ContentGenerator, RevisionFeedback};
pub use evidence_filter::EvidenceFilter;
pub use evidence_retriever::EvidenceRetriever;
pub use fact_checker::FactChecker;
pub use quiz_service::QuizService;
pub use relevance::{KeywordRelevance, RelevancePredicate};
pub use slide_builder::SlideBuilder;
pub use unit_planner::UnitPlanner;

pub mod content;
pub mod evidence;
pub mod loaders;
pub mod request;
pub mod result;
pub mod slides;
pub mod verdict;

pub use content::{ContentDraft, Section};
pub use evidence::{EvidenceItem, Relevance, RetrievalAttempt, RetrievalOutcome, SourceKind};
pub use loaders::{load_all_request_files, load_request_file};
pub use request::{LessonSpec, Request, UnitPlan};
pub use result::{
    BibliographyEntry, LessonResult, QualityFlags, QuizRecord, QuizTier, RenderStatus,
    RevisionOutcome, RevisionStatus, UnitResult,
};
pub use slides::{DocumentBlock, DocumentKind, DocumentStructure, Slide, SlideKind, SlideStructure, TitleSlide};
pub use verdict::{Confidence, FactCheckVerdict, Verdict};

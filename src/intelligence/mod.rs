pub mod annotate;
pub mod diagnostic;
pub mod emergency;
pub mod engine;
pub mod extraction;
pub mod format;
pub mod helpers;
pub mod interaction;
pub mod messages;
pub mod normalize;
pub mod reference;
pub mod rules;
pub mod types;

pub use annotate::{EntityAnnotator, EntitySpan, LexiconAnnotator};
pub use engine::DefaultRuleEngine;
pub use extraction::{extract, extract_series};
pub use format::{format_findings, render_text, DisplayRecord};
pub use normalize::NameNormalizer;
pub use reference::KnowledgeStore;
pub use types::{ClinicalError, InteractionReport, RuleEngine, TextAnalysis};

//! Tagging, categorization and semantic search over a single owner's files.
//!
//! Every stage makes at most one model call, and only [`TagExtractor`] reports
//! failure to its caller. Categorization and search degrade to a fallback
//! result instead.

mod categorize;
mod extractor;
mod matcher;
mod parser;
mod prompts;

use std::sync::Arc;

use categorize::Categorizer;
use extractor::TagExtractor;
use matcher::SemanticMatcher;

pub use categorize::CategoryAssignment;
#[cfg(test)]
pub use categorize::{OTHER_CATEGORY, UNCATEGORIZED};
pub use extractor::{ContentKind, TagError};
pub use matcher::retain_known;
pub use parser::parse_tag_list;

use crate::ai::CompletionClient;
use crate::config::TaggingConfig;

/// The three model-backed stages sharing one client handle.
pub struct Pipeline {
    pub extractor: TagExtractor,
    pub categorizer: Categorizer,
    pub matcher: SemanticMatcher,
}

impl Pipeline {
    pub fn new(client: Arc<dyn CompletionClient>, tagging: &TaggingConfig) -> Self {
        Self {
            extractor: TagExtractor::new(client.clone(), tagging.max_document_chars),
            categorizer: Categorizer::new(client.clone()),
            matcher: SemanticMatcher::new(client),
        }
    }
}

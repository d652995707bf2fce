use std::collections::HashSet;
use std::sync::Arc;

use super::{parser, prompts};
use crate::ai::CompletionClient;
use crate::library::FileRecord;

pub struct SemanticMatcher {
    client: Arc<dyn CompletionClient>,
}

impl SemanticMatcher {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Filenames the model considers relevant to `query`, most relevant first.
    ///
    /// Empty on an empty query, an empty corpus or any model failure. Names are
    /// returned as the model wrote them; see [`retain_known`].
    pub fn find_matches(&self, query: &str, records: &[FileRecord]) -> Vec<String> {
        let query = query.trim();
        if query.is_empty() || records.is_empty() {
            return vec![];
        }

        let prompt = prompts::search(query, &prompts::corpus(records));

        match self.client.complete(&prompt, None) {
            Ok(reply) => {
                let matches = parser::parse_filename_list(&reply);
                log::info!(
                    "op=search outcome=success files={} matches={}",
                    records.len(),
                    matches.len()
                );
                matches
            }
            Err(err) => {
                log::warn!("op=search outcome=fallback model={} err={err}", self.client.model());
                vec![]
            }
        }
    }
}

/// Keep only matches that name a record, first occurrence wins.
pub fn retain_known<'a>(matches: &[String], records: &'a [FileRecord]) -> Vec<&'a FileRecord> {
    let mut seen = HashSet::new();
    let mut dropped = 0usize;

    let known: Vec<&FileRecord> = matches
        .iter()
        .filter_map(|name| {
            let record = records.iter().find(|record| &record.filename == name);
            if record.is_none() {
                dropped += 1;
            }
            record
        })
        .filter(|record| seen.insert(record.filename.as_str()))
        .collect();

    if dropped > 0 {
        log::debug!("op=search dropped_unknown={dropped}");
    }

    known
}

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use super::parser::{self, CategoryPair};
use super::prompts;
use crate::ai::CompletionClient;
use crate::library::FileRecord;

/// Bucket for files the model did not place
pub const OTHER_CATEGORY: &str = "Other";
/// Single bucket returned when the model could not be asked at all
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub label: String,
    pub files: Vec<String>,
}

/// Category label → filenames. Labels keep the order the model first used them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryAssignment {
    categories: Vec<Category>,
}

impl CategoryAssignment {
    fn single(label: &str, files: Vec<String>) -> Self {
        let mut assignment = Self::default();
        for file in files {
            assignment.push(label, file);
        }
        assignment
    }

    /// Labels are matched case-insensitively; the first spelling wins.
    fn push(&mut self, label: &str, filename: String) {
        match self
            .categories
            .iter_mut()
            .find(|category| category.label.eq_ignore_ascii_case(label))
        {
            Some(category) => category.files.push(filename),
            None => self.categories.push(Category {
                label: label.to_string(),
                files: vec![filename],
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Files under `label`, matched the same case-insensitive way labels merge.
    #[cfg(test)]
    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.categories
            .iter()
            .find(|category| category.label.eq_ignore_ascii_case(label))
            .map(|category| category.files.as_slice())
    }

    #[cfg(test)]
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .flat_map(|category| category.files.iter().map(String::as_str))
    }

    #[cfg(test)]
    pub fn to_map(&self) -> std::collections::BTreeMap<String, Vec<String>> {
        self.categories
            .iter()
            .map(|category| (category.label.clone(), category.files.clone()))
            .collect()
    }
}

pub struct Categorizer {
    client: Arc<dyn CompletionClient>,
}

impl Categorizer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Group `records` into model-invented categories.
    ///
    /// Never fails: when the model cannot be reached every file lands in
    /// `Uncategorized`, and files the model skipped land in `Other`.
    pub fn categorize(&self, records: &[FileRecord]) -> CategoryAssignment {
        if records.is_empty() {
            return CategoryAssignment::default();
        }

        let prompt = prompts::categorize(&prompts::corpus(records));

        match self.client.complete(&prompt, None) {
            Ok(reply) => {
                let pairs = parser::parse_category_pairs(&reply);
                let assignment = reconcile(records, pairs);
                log::info!(
                    "op=categorize outcome=success files={} categories={}",
                    records.len(),
                    assignment.len()
                );
                assignment
            }
            Err(err) => {
                log::warn!("op=categorize outcome=fallback model={} err={err}", self.client.model());
                CategoryAssignment::single(UNCATEGORIZED, unique_filenames(records))
            }
        }
    }
}

/// Fit the model's pairs onto the authoritative file set.
///
/// Unknown filenames are dropped, a file keeps its first placement, and every
/// input file the model left out goes to `Other`.
pub fn reconcile(records: &[FileRecord], pairs: Vec<CategoryPair>) -> CategoryAssignment {
    let known: HashSet<&str> = records.iter().map(|r| r.filename.as_str()).collect();
    let mut placed: HashSet<String> = HashSet::new();
    let mut assignment = CategoryAssignment::default();

    let mut unknown = 0usize;
    let mut repeated = 0usize;

    for CategoryPair { category, filename } in pairs {
        if !known.contains(filename.as_str()) {
            unknown += 1;
            continue;
        }
        if placed.contains(&filename) {
            repeated += 1;
            continue;
        }
        placed.insert(filename.clone());
        assignment.push(&category, filename);
    }

    if unknown > 0 || repeated > 0 {
        log::warn!("op=categorize dropped_unknown={unknown} dropped_repeated={repeated}");
    }

    for filename in unique_filenames(records) {
        if !placed.contains(&filename) {
            assignment.push(OTHER_CATEGORY, filename);
        }
    }

    assignment
}

fn unique_filenames(records: &[FileRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| seen.insert(record.filename.as_str()))
        .map(|record| record.filename.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(names: &[&str]) -> Vec<FileRecord> {
        names
            .iter()
            .map(|name| FileRecord::new("alice", name, vec!["tag".to_string()]))
            .collect()
    }

    fn pair(category: &str, filename: &str) -> CategoryPair {
        CategoryPair {
            category: category.to_string(),
            filename: filename.to_string(),
        }
    }

    #[test]
    fn test_reconcile_adds_leftovers_to_other() {
        let assignment = reconcile(&records(&["a.pdf", "b.jpg"]), vec![pair("Receipts", "a.pdf")]);
        assert_eq!(assignment.get("Receipts"), Some(&["a.pdf".to_string()][..]));
        assert_eq!(assignment.get(OTHER_CATEGORY), Some(&["b.jpg".to_string()][..]));
    }

    #[test]
    fn test_reconcile_drops_unknown_filenames() {
        let assignment = reconcile(
            &records(&["a.pdf"]),
            vec![pair("Receipts", "a.pdf"), pair("Ghosts", "c.pdf")],
        );
        assert_eq!(assignment.len(), 1);
        assert!(assignment.get("Ghosts").is_none());
    }

    #[test]
    fn test_reconcile_first_placement_wins() {
        let assignment = reconcile(
            &records(&["a.pdf"]),
            vec![pair("Receipts", "a.pdf"), pair("Taxes", "a.pdf")],
        );
        assert_eq!(assignment.filenames().collect::<Vec<_>>(), vec!["a.pdf"]);
        assert!(assignment.get("Taxes").is_none());
    }

    #[test]
    fn test_reconcile_merges_labels_case_insensitively() {
        let assignment = reconcile(
            &records(&["a.pdf", "b.pdf", "c.pdf"]),
            vec![pair("Receipts", "a.pdf"), pair("receipts", "b.pdf"), pair("other", "c.pdf")],
        );
        assert_eq!(assignment.get("Receipts").unwrap().len(), 2);
        assert_eq!(assignment.len(), 2);
    }

    #[test]
    fn test_reconcile_model_other_absorbs_leftovers() {
        let assignment = reconcile(
            &records(&["a.pdf", "b.pdf"]),
            vec![pair("Other", "a.pdf")],
        );
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.get(OTHER_CATEGORY).unwrap(), &["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_lowercase_model_other_is_found_by_canonical_label() {
        let assignment = reconcile(
            &records(&["a.pdf", "b.pdf", "c.pdf"]),
            vec![pair("Receipts", "a.pdf"), pair("other", "b.pdf")],
        );
        assert_eq!(assignment.len(), 2);
        assert_eq!(assignment.get(OTHER_CATEGORY).unwrap(), &["b.pdf", "c.pdf"]);
        assert_eq!(assignment.get("RECEIPTS").unwrap(), &["a.pdf"]);
    }

    #[test]
    fn test_reconcile_without_pairs_puts_everything_in_other() {
        let assignment = reconcile(&records(&["a.pdf", "b.jpg"]), vec![]);
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.get(OTHER_CATEGORY).unwrap(), &["a.pdf", "b.jpg"]);
    }

    #[test]
    fn test_assignment_serializes_as_list() {
        let assignment = reconcile(&records(&["a.pdf"]), vec![pair("Receipts", "a.pdf")]);
        let json = serde_json::to_value(&assignment).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "label": "Receipts", "files": ["a.pdf"] }])
        );
    }
}

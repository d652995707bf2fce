//! Tolerant readers for the model's free-text replies.
//!
//! The reply format is only a prompt-level convention, so every mode here
//! extracts what it can and never fails.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPair {
    pub category: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairKey {
    Category,
    Filename,
}

/// Comma-separated tags: trimmed, empties dropped, order and duplicates kept.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    split_tokens(raw, &[','])
}

/// Comma-separated filenames. An empty reply means "no matches".
pub fn parse_filename_list(raw: &str) -> Vec<String> {
    split_tokens(raw, &[',', '\n'])
}

/// Alternating `Category:<label>` / `Filename:<name>` tokens.
///
/// Tokens are consumed pairwise. A pair that does not parse (missing colon,
/// wrong key, empty value, dangling tail) is skipped and reading resumes at
/// the next token, so one bad pair never costs the rest of the reply.
pub fn parse_category_pairs(raw: &str) -> Vec<CategoryPair> {
    let tokens = split_tokens(raw, &[',', '\n']);

    let mut pairs = Vec::with_capacity(tokens.len() / 2);
    let mut skipped = 0usize;
    let mut idx = 0;

    while idx < tokens.len() {
        let category = match parse_field(&tokens[idx]) {
            Some((PairKey::Category, value)) => value,
            _ => {
                skipped += 1;
                idx += 1;
                continue;
            }
        };

        match tokens.get(idx + 1).and_then(|token| parse_field(token)) {
            Some((PairKey::Filename, filename)) => {
                pairs.push(CategoryPair {
                    category: category.to_string(),
                    filename: filename.to_string(),
                });
                idx += 2;
            }
            _ => {
                skipped += 1;
                idx += 1;
            }
        }
    }

    if skipped > 0 {
        log::debug!("category reply: pairs={} skipped_tokens={skipped}", pairs.len());
    }

    pairs
}

fn split_tokens(raw: &str, delimiters: &[char]) -> Vec<String> {
    raw.split(delimiters)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split `key:value` on the first colon.
fn parse_field(token: &str) -> Option<(PairKey, &str)> {
    let (key, value) = token.split_once(':')?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let key = key.trim();
    if key.eq_ignore_ascii_case("category") {
        Some((PairKey::Category, value))
    } else if key.eq_ignore_ascii_case("filename") {
        Some((PairKey::Filename, value))
    } else {
        None
    }
}

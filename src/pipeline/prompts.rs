use crate::library::FileRecord;

pub const IMAGE_TAGS: &str = "Look at this image and reply with a comma-separated list of \
5 to 7 short keywords describing what it shows: subjects, objects, setting and any text \
visible in it. Example reply: 'document, ID card, university, student photo'. \
Reply with the list only.";

pub fn document_tags(kind: &str, text: &str) -> String {
    format!(
        "Below is the beginning of a {kind} file. Reply with a comma-separated list of \
         7 to 10 short tags naming its main topics, document type and key entities \
         (people, companies, places, dates). Reply with the list only.\n\n\
         ---\n{text}\n---"
    )
}

/// One `filename, tags` line per record.
pub fn corpus(records: &[FileRecord]) -> String {
    records
        .iter()
        .map(|record| format!("{}, {}", record.filename, record.tags.join(",")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn categorize(corpus: &str) -> String {
    format!(
        "You organize a personal file library. Each line below is a filename followed by \
         the tags describing that file.\n\n{corpus}\n\n\
         Invent a small set of intuitive category names (for example Receipts, Travel \
         Photos, Work Documents) and put every file into exactly one category. \
         Answer strictly as a single comma-separated sequence of alternating \
         Category:<name> and Filename:<filename> entries, using each filename exactly as \
         written above and nothing else.\n\
         Example answer: Category:Receipts, Filename:lunch.jpg, Category:Receipts, \
         Filename:invoice_march.pdf, Category:Travel Photos, Filename:beach.png"
    )
}

pub fn search(query: &str, corpus: &str) -> String {
    format!(
        "A user is searching their file library for: \"{query}\"\n\n\
         Each line below is a filename followed by the tags describing that file.\n\n\
         {corpus}\n\n\
         Reply with ONLY a comma-separated list of the exact filenames that match the \
         search, most relevant first. If no file matches, reply with an empty string."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_lines() {
        let records = vec![
            FileRecord::new("alice", "a.pdf", vec!["invoice".into(), "payment".into()]),
            FileRecord::new("alice", "b.jpg", vec![]),
        ];
        assert_eq!(corpus(&records), "a.pdf, invoice,payment\nb.jpg, ");
    }

    #[test]
    fn test_prompts_embed_inputs() {
        let prompt = search("tax 2023", "a.pdf, tax");
        assert!(prompt.contains("\"tax 2023\""));
        assert!(prompt.contains("a.pdf, tax"));

        let prompt = categorize("a.pdf, tax");
        assert!(prompt.contains("a.pdf, tax"));
        assert!(prompt.contains("Category:Receipts, Filename:lunch.jpg"));
    }
}

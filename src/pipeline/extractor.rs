use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::{parser, prompts};
use crate::ai::{AiError, CompletionClient, ImagePart};
use crate::documents;

/// Content discriminator driving how a file is tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Image,
    PdfDocument,
    WordDocument,
    Other,
}

impl ContentKind {
    pub fn from_filename(filename: &str) -> Self {
        match extension(filename).as_deref() {
            Some("png" | "jpg" | "jpeg" | "gif" | "webp") => ContentKind::Image,
            Some("pdf") => ContentKind::PdfDocument,
            Some("docx") => ContentKind::WordDocument,
            _ => ContentKind::Other,
        }
    }

    /// Tags used for documents with no extractable text.
    fn fallback_tags(self) -> Vec<String> {
        let kind = match self {
            ContentKind::PdfDocument => "pdf",
            ContentKind::WordDocument => "docx",
            ContentKind::Image | ContentKind::Other => "file",
        };
        vec![kind.to_string(), "document".to_string()]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("file is empty")]
    EmptyContent,

    #[error("AI tagging failed: {0}")]
    Ai(#[from] AiError),
}

pub struct TagExtractor {
    client: Arc<dyn CompletionClient>,
    max_document_chars: usize,
}

impl TagExtractor {
    pub fn new(client: Arc<dyn CompletionClient>, max_document_chars: usize) -> Self {
        Self {
            client,
            max_document_chars,
        }
    }

    /// Produce descriptive tags for one file.
    ///
    /// An error means "no tags could be produced", which callers must keep
    /// apart from a successful empty list.
    pub fn extract_tags(
        &self,
        filename: &str,
        content: &[u8],
        kind: ContentKind,
    ) -> Result<Vec<String>, TagError> {
        match kind {
            ContentKind::Image => self.tag_image(filename, content),
            ContentKind::PdfDocument | ContentKind::WordDocument => {
                self.tag_document(filename, content, kind)
            }
            ContentKind::Other => Ok(vec![
                extension(filename).unwrap_or_else(|| "file".to_string())
            ]),
        }
    }

    fn tag_image(&self, filename: &str, content: &[u8]) -> Result<Vec<String>, TagError> {
        if content.is_empty() {
            return Err(TagError::EmptyContent);
        }

        let mime_type = infer::get(content)
            .map(|kind| kind.mime_type())
            .filter(|mime| mime.starts_with("image/"))
            .unwrap_or_else(|| image_mime_from_extension(filename));

        let image = ImagePart {
            mime_type,
            data: content,
        };
        let reply = self.client.complete(prompts::IMAGE_TAGS, Some(image))?;

        Ok(parser::parse_tag_list(&reply))
    }

    fn tag_document(
        &self,
        filename: &str,
        content: &[u8],
        kind: ContentKind,
    ) -> Result<Vec<String>, TagError> {
        let (label, extracted) = match kind {
            ContentKind::WordDocument => ("Word", documents::extract_docx_text(content)),
            _ => ("PDF", documents::extract_pdf_text(content)),
        };

        let text = extracted.unwrap_or_else(|err| {
            log::warn!("file={filename} outcome=unreadable err={err:#}");
            String::new()
        });

        if text.trim().is_empty() {
            return Ok(kind.fallback_tags());
        }

        let text = documents::truncate_chars(&text, self.max_document_chars);
        let reply = self
            .client
            .complete(&prompts::document_tags(label, text), None)?;

        Ok(parser::parse_tag_list(&reply))
    }
}

/// Lowercased extension without the dot.
fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .filter(|ext| !ext.is_empty())
}

fn image_mime_from_extension(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::StubClient;

    fn extractor(client: &Arc<StubClient>) -> TagExtractor {
        TagExtractor::new(client.clone(), 4000)
    }

    #[test]
    fn test_kind_from_filename() {
        assert_eq!(ContentKind::from_filename("a.JPG"), ContentKind::Image);
        assert_eq!(ContentKind::from_filename("scan.pdf"), ContentKind::PdfDocument);
        assert_eq!(ContentKind::from_filename("cv.docx"), ContentKind::WordDocument);
        assert_eq!(ContentKind::from_filename("notes.txt"), ContentKind::Other);
        assert_eq!(ContentKind::from_filename("Makefile"), ContentKind::Other);
    }

    #[test]
    fn test_other_uses_extension_without_ai() {
        let client = StubClient::replying("unused");
        let tags = extractor(&client)
            .extract_tags("Notes.TXT", b"hello", ContentKind::Other)
            .unwrap();
        assert_eq!(tags, vec!["txt"]);

        let tags = extractor(&client)
            .extract_tags("Makefile", b"all:", ContentKind::Other)
            .unwrap();
        assert_eq!(tags, vec!["file"]);
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn test_image_sends_attachment_and_parses_reply() {
        let client = StubClient::replying("beach, sunset , ,vacation");
        let png = b"\x89PNG\r\n\x1a\n0000";
        let tags = extractor(&client)
            .extract_tags("b.jpg", png, ContentKind::Image)
            .unwrap();

        assert_eq!(tags, vec!["beach", "sunset", "vacation"]);
        assert_eq!(client.calls(), 1);
        assert_eq!(client.last_image_mime().as_deref(), Some("image/png"));
    }

    #[test]
    fn test_image_ai_failure_is_error() {
        let client = StubClient::failing();
        let result = extractor(&client).extract_tags("b.jpg", b"jpegbytes", ContentKind::Image);
        assert!(matches!(result, Err(TagError::Ai(_))));
    }

    #[test]
    fn test_empty_image_is_error_without_ai() {
        let client = StubClient::replying("x");
        let result = extractor(&client).extract_tags("b.jpg", b"", ContentKind::Image);
        assert!(matches!(result, Err(TagError::EmptyContent)));
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn test_empty_document_uses_fallback_without_ai() {
        let client = StubClient::replying("unused");
        let docx = documents::build_docx("<w:document><w:body><w:p/></w:body></w:document>");
        let tags = extractor(&client)
            .extract_tags("empty.docx", &docx, ContentKind::WordDocument)
            .unwrap();
        assert_eq!(tags, vec!["docx", "document"]);
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn test_unreadable_pdf_uses_fallback() {
        let client = StubClient::replying("unused");
        let tags = extractor(&client)
            .extract_tags("broken.pdf", b"not a pdf", ContentKind::PdfDocument)
            .unwrap();
        assert_eq!(tags, vec!["pdf", "document"]);
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn test_document_text_is_truncated_in_prompt() {
        let client = StubClient::replying("invoice, acme, 2024");
        let body = format!(
            "<w:document><w:body><w:p><w:r><w:t>{}TAIL</w:t></w:r></w:p></w:body></w:document>",
            "x".repeat(50)
        );
        let docx = documents::build_docx(&body);

        let tags = TagExtractor::new(client.clone(), 20)
            .extract_tags("bill.docx", &docx, ContentKind::WordDocument)
            .unwrap();

        assert_eq!(tags, vec!["invoice", "acme", "2024"]);
        let prompt = client.last_prompt().unwrap();
        assert!(prompt.contains(&"x".repeat(20)));
        assert!(!prompt.contains(&"x".repeat(21)));
        assert!(!prompt.contains("TAIL"));
    }
}

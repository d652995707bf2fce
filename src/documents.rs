//! Plain-text extraction for document uploads.
//!
//! An empty string is a normal result (scanned PDFs, image-only documents).

use std::io::{Cursor, Read};

use anyhow::{anyhow, Context};
use once_cell::sync::Lazy;
use regex::Regex;

/// Main body part of a .docx container
const DOCX_BODY: &str = "word/document.xml";

static DOCX_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|</w:p>|<w:tab/>|<w:br/>")
        .expect("static regex")
});

pub fn extract_pdf_text(data: &[u8]) -> anyhow::Result<String> {
    // pdf-extract panics on some malformed inputs
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data))
        .map_err(|_| anyhow!("pdf parser panicked"))?;

    let text = result.context("failed to extract pdf text")?;
    Ok(text.trim().to_string())
}

pub fn extract_docx_text(data: &[u8]) -> anyhow::Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).context("docx is not a zip container")?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .context("docx has no document body")?
        .read_to_string(&mut xml)
        .context("docx body is not utf8")?;

    Ok(docx_xml_to_text(&xml))
}

fn docx_xml_to_text(xml: &str) -> String {
    let mut text = String::new();

    for captures in DOCX_RUN.captures_iter(xml) {
        match captures.get(1) {
            Some(run) => text.push_str(&unescape_xml(run.as_str())),
            None => match &captures[0] {
                "<w:tab/>" => text.push('\t'),
                _ => text.push('\n'),
            },
        }
    }

    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// First `max_chars` characters of `text` (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
pub(crate) fn build_docx(body_xml: &str) -> Vec<u8> {
    use std::io::Write;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(DOCX_BODY, zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(body_xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"<?xml version="1.0"?>
<w:document><w:body>
<w:p><w:r><w:t>Invoice #42</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Total: </w:t></w:r><w:r><w:t>$10 &amp; tax</w:t></w:r></w:p>
<w:p></w:p>
</w:body></w:document>"#;

    #[test]
    fn test_docx_paragraphs_and_entities() {
        let text = docx_xml_to_text(BODY);
        assert_eq!(text, "Invoice #42\nTotal: $10 & tax");
    }

    #[test]
    fn test_docx_from_container() {
        let docx = build_docx(BODY);
        let text = extract_docx_text(&docx).unwrap();
        assert!(text.starts_with("Invoice #42"));
    }

    #[test]
    fn test_docx_without_text_is_empty() {
        let docx = build_docx("<w:document><w:body><w:p/></w:body></w:document>");
        assert_eq!(extract_docx_text(&docx).unwrap(), "");
    }

    #[test]
    fn test_docx_garbage_is_error() {
        assert!(extract_docx_text(b"not a zip").is_err());
    }

    #[test]
    fn test_pdf_garbage_is_error() {
        assert!(extract_pdf_text(b"%PDF-garbage").is_err());
    }

    #[test]
    fn test_truncate_chars_is_utf8_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}

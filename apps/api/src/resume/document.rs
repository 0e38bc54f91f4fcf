//! Text extraction for uploaded resumes.
//!
//! PDF goes through `pdf-extract`. DOCX is a zip archive whose body lives in
//! `word/document.xml`; the visible text is the content of its `<w:t>` runs.
//! Both parsers are synchronous and run on the blocking pool.

use std::io::{Cursor, Read};

use bytes::Bytes;
use tracing::warn;
use zip::ZipArchive;

use crate::errors::AppError;

/// Text kept for the prompt. Anything longer is cut.
pub const MAX_RESUME_CHARS: usize = 15_000;

/// Below this, the upload is most likely a scanned image with no text layer.
const MIN_RESUME_CHARS: usize = 50;

const DOCX_BODY: &str = "word/document.xml";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

/// The file extension wins; the declared content type is the fallback.
pub fn detect_kind(
    filename: Option<&str>,
    content_type: Option<&str>,
) -> Result<DocumentKind, AppError> {
    let extension = filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    let mime = content_type.unwrap_or_default().to_ascii_lowercase();

    match (extension.as_deref(), mime.as_str()) {
        (Some("pdf"), _) | (_, "application/pdf") => Ok(DocumentKind::Pdf),
        (Some("docx"), _) | (_, DOCX_MIME) => Ok(DocumentKind::Docx),
        (Some("txt" | "md"), _) | (_, "text/plain") => Ok(DocumentKind::PlainText),
        _ => Err(AppError::UnsupportedMedia(
            "Only PDF and DOCX files are allowed".to_string(),
        )),
    }
}

/// Pulls normalized text out of an upload, capped at [`MAX_RESUME_CHARS`].
pub async fn extract_text(kind: DocumentKind, data: Bytes) -> Result<String, AppError> {
    let raw = tokio::task::spawn_blocking(move || match kind {
        DocumentKind::Pdf => pdf_text(&data),
        DocumentKind::Docx => docx_text(data),
        DocumentKind::PlainText => plain_text(&data),
    })
    .await
    .map_err(|e| {
        if e.is_panic() {
            warn!("{kind:?} parser panicked on upload");
            unreadable()
        } else {
            AppError::Internal(anyhow::anyhow!("spawn_blocking failed in document extraction: {e}"))
        }
    })??;

    let text = normalize_whitespace(&raw);
    if text.chars().count() < MIN_RESUME_CHARS {
        return Err(AppError::UnreadableDocument(
            "The resume has too little text. Scanned or image-only files are not supported."
                .to_string(),
        ));
    }
    Ok(text.chars().take(MAX_RESUME_CHARS).collect())
}

fn unreadable() -> AppError {
    AppError::UnreadableDocument("Could not read text from the uploaded resume.".to_string())
}

fn pdf_text(data: &[u8]) -> Result<String, AppError> {
    pdf_extract::extract_text_from_mem(data).map_err(|e| {
        warn!("PDF extraction failed: {e:?}");
        unreadable()
    })
}

fn docx_text(data: Bytes) -> Result<String, AppError> {
    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(|e| {
        warn!("DOCX is not a zip archive: {e}");
        unreadable()
    })?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|e| {
            warn!("DOCX has no {DOCX_BODY}: {e}");
            unreadable()
        })?
        .read_to_string(&mut xml)
        .map_err(|e| {
            warn!("DOCX body is unreadable: {e}");
            unreadable()
        })?;
    Ok(docx_xml_to_text(&xml))
}

fn plain_text(data: &[u8]) -> Result<String, AppError> {
    std::str::from_utf8(data)
        .map(str::to_string)
        .map_err(|_| unreadable())
}

/// Collects `<w:t>` run text. Paragraph ends and breaks become newlines.
fn docx_xml_to_text(xml: &str) -> String {
    let mut text = String::new();
    let mut in_run_text = false;
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        if in_run_text {
            text.push_str(&decode_entities(&rest[..open]));
        }
        let Some(len) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + len];
        rest = &rest[open + len + 1..];

        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default();

        match (name, closing) {
            ("w:t", false) => in_run_text = !self_closing,
            ("w:t", true) => in_run_text = false,
            ("w:p", true) | ("w:br", false) => text.push('\n'),
            ("w:tab", false) => text.push('\t'),
            _ => {}
        }
    }
    text
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapses runs of spaces inside each line and drops blank lines.
fn normalize_whitespace(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

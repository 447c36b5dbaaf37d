//! Text extraction from uploaded documents.
//!
//! Normalizes `.txt`, `.eml`, and `.pdf` uploads into plain text for the
//! classification pipeline. Validation happens around extraction: the size
//! cap is enforced before any parsing, and a minimum non-whitespace length
//! is enforced on the result so near-empty content is rejected instead of
//! silently classified.

use mail_parser::MessageParser;
use tracing::debug;

use crate::config::Settings;
use crate::error::ExtractError;

/// Supported upload formats, detected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.txt` — strict UTF-8 text.
    PlainText,
    /// `.eml` — RFC 5322 email message.
    Email,
    /// `.pdf` — embedded text layer only; scanned images are rejected.
    Pdf,
}

impl DocumentFormat {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Email => "email",
            Self::Pdf => "pdf",
        }
    }
}

/// Extracted email content. Immutable once produced.
#[derive(Debug, Clone)]
pub struct EmailContent {
    pub text: String,
    pub filename: Option<String>,
    pub format: Option<DocumentFormat>,
}

impl EmailContent {
    /// Wrap already-plain text from the direct entry point.
    pub fn from_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            filename: None,
            format: None,
        }
    }
}

/// Detect the upload format from the filename extension.
pub fn detect_format(filename: &str) -> Option<DocumentFormat> {
    let ext = filename.rsplit_once('.').map(|(_, e)| e.to_lowercase())?;
    match ext.as_str() {
        "txt" => Some(DocumentFormat::PlainText),
        "eml" => Some(DocumentFormat::Email),
        "pdf" => Some(DocumentFormat::Pdf),
        _ => None,
    }
}

/// Document extractor with the request-validation limits applied.
#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    max_upload_bytes: usize,
    min_content_chars: usize,
}

impl DocumentExtractor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            max_upload_bytes: settings.max_upload_bytes,
            min_content_chars: settings.min_content_chars,
        }
    }

    /// Extract plain text from uploaded bytes.
    pub fn extract(&self, bytes: &[u8], filename: &str) -> Result<EmailContent, ExtractError> {
        if bytes.len() > self.max_upload_bytes {
            return Err(ExtractError::FileTooLarge {
                size: bytes.len(),
                max: self.max_upload_bytes,
            });
        }

        let format = detect_format(filename).ok_or_else(|| {
            let ext = filename
                .rsplit_once('.')
                .map(|(_, e)| format!(".{e}"))
                .unwrap_or_else(|| "(no extension)".to_string());
            ExtractError::UnsupportedFormat(ext)
        })?;

        let text = match format {
            DocumentFormat::PlainText => extract_txt(bytes)?,
            DocumentFormat::Email => extract_eml(bytes)?,
            DocumentFormat::Pdf => extract_pdf(bytes)?,
        };

        let text = text.trim().to_string();
        self.check_min_length(&text)?;

        debug!(
            filename,
            format = format.label(),
            chars = text.len(),
            "Extracted upload"
        );

        Ok(EmailContent {
            text,
            filename: Some(filename.to_string()),
            format: Some(format),
        })
    }

    /// Validate raw text from the direct (non-file) entry point.
    pub fn validate_text(&self, text: &str) -> Result<(), ExtractError> {
        self.check_min_length(text)
    }

    fn check_min_length(&self, text: &str) -> Result<(), ExtractError> {
        let chars = text.chars().filter(|c| !c.is_whitespace()).count();
        if chars < self.min_content_chars {
            return Err(ExtractError::ContentTooShort {
                chars,
                min: self.min_content_chars,
            });
        }
        Ok(())
    }
}

// ── Format-specific extractors ──────────────────────────────────────

fn extract_txt(bytes: &[u8]) -> Result<String, ExtractError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| ExtractError::UnsupportedEncoding("file is not valid UTF-8".into()))
}

/// Extract the primary text body from an email message, prefixed with the
/// From/Subject headers so the classifier sees the same context a reader
/// would. Attachments and remaining headers are discarded.
fn extract_eml(bytes: &[u8]) -> Result<String, ExtractError> {
    let parsed = MessageParser::default()
        .parse(bytes)
        .ok_or_else(|| ExtractError::Malformed {
            format: "email".into(),
            reason: "could not parse message structure".into(),
        })?;

    let from = parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .unwrap_or("(unknown)");
    let subject = parsed.subject().unwrap_or("(no subject)");

    let body = if let Some(text) = parsed.body_text(0) {
        text.to_string()
    } else if let Some(html) = parsed.body_html(0) {
        strip_html(html.as_ref())
    } else {
        return Err(ExtractError::NoExtractableText("email".into()));
    };

    let body = body.trim();
    if body.is_empty() {
        return Err(ExtractError::NoExtractableText("email".into()));
    }

    Ok(format!("From: {from}\nSubject: {subject}\n\n{body}"))
}

/// Extract the embedded text layer of a PDF.
///
/// pdf-extract can panic on malformed input, so the call is isolated with
/// catch_unwind. A PDF whose pages carry no text (scanned images) is an
/// error, not an empty success.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let result =
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }));

    let text = match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            return Err(ExtractError::Malformed {
                format: "pdf".into(),
                reason: e.to_string(),
            });
        }
        Err(_) => {
            return Err(ExtractError::Malformed {
                format: "pdf".into(),
                reason: "extraction panicked (malformed file)".into(),
            });
        }
    };

    if text.trim().is_empty() {
        return Err(ExtractError::NoExtractableText("pdf".into()));
    }
    Ok(text)
}

/// Strip HTML tags and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

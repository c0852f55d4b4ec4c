/*!
 * Document text extraction.
 *
 * Extractors turn a script document into ordered pages of raw text. Plain
 * text files are split on form feeds; PDFs are converted with the external
 * `pdftotext` tool, which emits a form feed after every page.
 */

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use tokio::process::Command;

use crate::errors::ScriptError;

use super::parser::Page;

/// Page separator used by pdftotext and many text exports
const FORM_FEED: char = '\u{000C}';

/// Produces ordered page text from a document
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Extract the pages of `document`.
    ///
    /// Fails with `UnreadableDocument` when no text can be extracted at all.
    async fn extract_pages(&self, document: &Path) -> Result<Vec<Page>, ScriptError>;
}

/// Split already extracted text into pages
pub fn pages_from_text(text: &str) -> Result<Vec<Page>, ScriptError> {
    if text.trim().is_empty() {
        return Err(ScriptError::UnreadableDocument("document contains no text".to_string()));
    }

    let text = text.trim_end_matches(|c: char| c == FORM_FEED || c.is_whitespace());
    Ok(text
        .split(FORM_FEED)
        .enumerate()
        .map(|(index, page)| Page::new(index, page))
        .collect())
}

/// Extractor for `.txt` / `.fountain` style plain-text scripts
#[derive(Debug, Default, Clone)]
pub struct PlainTextExtractor;

#[async_trait]
impl PageExtractor for PlainTextExtractor {
    async fn extract_pages(&self, document: &Path) -> Result<Vec<Page>, ScriptError> {
        let bytes = tokio::fs::read(document).await.map_err(|e| {
            ScriptError::UnreadableDocument(format!("{}: {}", document.display(), e))
        })?;
        let text = String::from_utf8_lossy(&bytes);
        pages_from_text(&text)
    }
}

/// Extractor that shells out to poppler's `pdftotext`
#[derive(Debug, Clone)]
pub struct PdfTextExtractor {
    program: String,
    timeout: Duration,
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self {
            program: "pdftotext".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl PdfTextExtractor {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PageExtractor for PdfTextExtractor {
    async fn extract_pages(&self, document: &Path) -> Result<Vec<Page>, ScriptError> {
        if !document.exists() {
            return Err(ScriptError::UnreadableDocument(format!(
                "file does not exist: {}",
                document.display()
            )));
        }

        debug!("Extracting text from {} with {}", document.display(), self.program);

        // "-layout" keeps cue indentation, "-" writes to stdout
        let output_future = Command::new(&self.program)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(document)
            .arg("-")
            // A timed-out run must not outlive the dropped future
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = output_future => {
                result.map_err(|e| ScriptError::UnreadableDocument(format!("failed to run {}: {}", self.program, e)))?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(ScriptError::UnreadableDocument(format!(
                    "{} timed out after {}s", self.program, self.timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Text extraction failed: {}", stderr.trim());
            return Err(ScriptError::UnreadableDocument(stderr.trim().to_string()));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        pages_from_text(&text)
    }
}

/// Pick an extractor from the document's extension
pub fn extractor_for(document: &Path) -> Box<dyn PageExtractor> {
    let is_pdf = document
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if is_pdf {
        Box::new(PdfTextExtractor::default())
    } else {
        Box::new(PlainTextExtractor)
    }
}

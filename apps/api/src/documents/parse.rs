//! CV upload parsing: `.docx` and `.tex` only.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;

use crate::documents::CvFormat;
use crate::errors::AppError;

/// The plain-text view of an uploaded CV, ready to hand to the refinement engine.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedCv {
    pub format: CvFormat,
    /// Base name of the upload, path components stripped.
    pub filename: String,
    pub text: String,
}

/// Parses an uploaded CV. Any extension other than `.docx` / `.tex` is rejected.
pub fn parse_cv_upload(filename: &str, bytes: &[u8]) -> Result<ParsedCv, AppError> {
    let filename = base_name(filename).to_string();
    let format = CvFormat::from_filename(&filename)
        .ok_or_else(|| AppError::UnsupportedFormat(filename.clone()))?;

    let text = match format {
        CvFormat::Docx => extract_docx_text(bytes)?,
        CvFormat::Tex => decode_utf8_ignoring_invalid(bytes),
    };

    Ok(ParsedCv {
        format,
        filename,
        text,
    })
}

/// Browsers may send `C:\fakepath\cv.docx`; keep only the last component.
fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
}

/// Drops invalid byte sequences instead of substituting U+FFFD.
fn decode_utf8_ignoring_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Reads paragraph text out of `word/document.xml`, one line per `<w:p>`.
fn extract_docx_text(bytes: &[u8]) -> Result<String, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        AppError::UnprocessableEntity(format!("CV is not a readable .docx file: {e}"))
    })?;

    let mut doc_xml = String::new();
    {
        let mut doc_entry = archive.by_name("word/document.xml").map_err(|_| {
            AppError::UnprocessableEntity("Invalid .docx: missing word/document.xml".to_string())
        })?;
        doc_entry.read_to_string(&mut doc_xml).map_err(|e| {
            AppError::UnprocessableEntity(format!("Failed to read document.xml: {e}"))
        })?;
    }

    let mut reader = Reader::from_str(&doc_xml);
    let mut paragraphs: Vec<String> = Vec::new();
    // Text boxes nest whole paragraphs inside a run; each open <w:p> keeps its own buffer.
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    // <w:tabs> in paragraph properties holds tab stops, not tab characters.
    let mut in_tab_stops = false;
    // <mc:Fallback> repeats the text of the preceding <mc:Choice>.
    let mut fallback_depth = 0u32;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AppError::UnprocessableEntity(format!(
                    "document.xml is not valid XML: {e}"
                )))
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"Fallback" => {
                fallback_depth += 1;
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"Fallback" => {
                fallback_depth = fallback_depth.saturating_sub(1);
            }
            _ if fallback_depth > 0 => {}
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"t" => in_text = true,
                b"tabs" => in_tab_stops = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match (e.local_name().as_ref(), open.last_mut()) {
                // Self-closing paragraph: an empty line.
                (b"p", _) => paragraphs.push(String::new()),
                (b"tab", Some(current)) if !in_tab_stops => current.push('\t'),
                (b"br" | b"cr", Some(current)) => current.push('\n'),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(text) = open.pop() {
                        paragraphs.push(text);
                    }
                }
                b"t" => in_text = false,
                b"tabs" => in_tab_stops = false,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e.unescape().map_err(|err| {
                    AppError::UnprocessableEntity(format!("Invalid text in document.xml: {err}"))
                })?;
                if let Some(current) = open.last_mut() {
                    current.push_str(&text);
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}

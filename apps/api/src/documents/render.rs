//! Plain text → downloadable file, in the CV's original format.
//!
//! `.docx` output is a minimal WordprocessingML package with one plain paragraph per
//! input line. Styling from the original upload is not reconstructed.

use std::io::{Cursor, Write};

use bytes::Bytes;
use quick_xml::escape::escape;
use zip::write::SimpleFileOptions;

use crate::documents::CvFormat;
use crate::errors::AppError;

pub const COVER_LETTER_FILENAME: &str = "cover_letter.docx";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_XML_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_XML_TAIL: &str = "</w:body></w:document>";

/// A rendered artifact ready to be served as a download.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Bytes,
}

/// Renders `text` as a file of `format`. The filename keeps its base name but always
/// carries the extension of `format`.
pub fn render_document(
    text: &str,
    format: CvFormat,
    filename: &str,
) -> Result<RenderedDocument, AppError> {
    let bytes = match format {
        CvFormat::Docx => build_docx(text)?,
        CvFormat::Tex => Bytes::copy_from_slice(text.as_bytes()),
    };

    Ok(RenderedDocument {
        filename: output_filename(filename, format),
        content_type: format.content_type(),
        bytes,
    })
}

/// The cover letter is always delivered as `cover_letter.docx`.
pub fn render_cover_letter(text: &str) -> Result<RenderedDocument, AppError> {
    render_document(text, CvFormat::Docx, COVER_LETTER_FILENAME)
}

fn output_filename(filename: &str, format: CvFormat) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() {
        return format.default_filename().to_string();
    }
    if CvFormat::from_filename(name) == Some(format) {
        return name.to_string();
    }
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    format!("{stem}.{}", format.extension())
}

fn build_docx(text: &str) -> Result<Bytes, AppError> {
    let document_xml = document_xml(text);

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, contents) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML),
        ("_rels/.rels", ROOT_RELS_XML),
        ("word/document.xml", document_xml.as_str()),
    ] {
        writer
            .start_file(name, options)
            .map_err(|e| AppError::Render(format!("failed to add {name}: {e}")))?;
        writer
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::Render(format!("failed to write {name}: {e}")))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| AppError::Render(format!("failed to finish .docx archive: {e}")))?;
    Ok(Bytes::from(cursor.into_inner()))
}

fn document_xml(text: &str) -> String {
    let mut xml = String::from(DOCUMENT_XML_HEAD);
    for line in text.lines() {
        let line = strip_xml_invalid_chars(line);
        if line.is_empty() {
            xml.push_str("<w:p/>");
            continue;
        }
        xml.push_str("<w:p><w:r>");
        for (i, segment) in line.split('\t').enumerate() {
            if i > 0 {
                xml.push_str("<w:tab/>");
            }
            if !segment.is_empty() {
                xml.push_str(r#"<w:t xml:space="preserve">"#);
                xml.push_str(&escape(segment));
                xml.push_str("</w:t>");
            }
        }
        xml.push_str("</w:r></w:p>");
    }
    xml.push_str(DOCUMENT_XML_TAIL);
    xml
}

/// XML 1.0 forbids most C0 control characters and the noncharacters U+FFFE / U+FFFF.
fn strip_xml_invalid_chars(line: &str) -> String {
    line.chars()
        .filter(|c| *c == '\t' || !c.is_control() || *c as u32 >= 0x80)
        .filter(|c| !matches!(*c, '\u{fffe}' | '\u{ffff}'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::parse_cv_upload;

    #[test]
    fn test_tex_render_is_raw_utf8() {
        let text = "\\documentclass{article}\n\\begin{document}Caf\u{e9}\\end{document}";
        let doc = render_document(text, CvFormat::Tex, "my_cv.tex").unwrap();
        assert_eq!(doc.filename, "my_cv.tex");
        assert_eq!(doc.content_type, "application/x-tex");
        assert_eq!(doc.bytes.as_ref(), text.as_bytes());
    }

    #[test]
    fn test_docx_render_reads_back_line_per_paragraph() {
        let text = "Dear Hiring Manager,\n\nI built R&D tools <fast>.\n2019\t2023";
        let doc = render_document(text, CvFormat::Docx, "cv.docx").unwrap();
        assert_eq!(doc.filename, "cv.docx");

        let parsed = parse_cv_upload(&doc.filename, &doc.bytes).unwrap();
        assert_eq!(parsed.text, text);
    }

    #[test]
    fn test_docx_package_has_required_parts() {
        let doc = render_cover_letter("Hello").unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(doc.bytes.to_vec())).unwrap();
        assert!(archive.by_name("[Content_Types].xml").is_ok());
        assert!(archive.by_name("_rels/.rels").is_ok());
        assert!(archive.by_name("word/document.xml").is_ok());
    }

    #[test]
    fn test_cover_letter_is_always_docx() {
        let doc = render_cover_letter("Dear team").unwrap();
        assert_eq!(doc.filename, COVER_LETTER_FILENAME);
        assert_eq!(doc.content_type, CvFormat::Docx.content_type());
    }

    #[test]
    fn test_output_filename_forces_extension() {
        assert_eq!(output_filename("resume.docx", CvFormat::Tex), "resume.tex");
        assert_eq!(output_filename("resume", CvFormat::Docx), "resume.docx");
        assert_eq!(output_filename("Resume.TEX", CvFormat::Tex), "Resume.TEX");
        assert_eq!(output_filename("", CvFormat::Tex), "cv.tex");
        assert_eq!(output_filename("../../etc/cv.tex", CvFormat::Tex), "cv.tex");
    }

    #[test]
    fn test_control_characters_are_stripped_from_docx() {
        let xml = document_xml("bad\u{0b}char");
        assert!(xml.contains(">badchar<"));
    }

    #[test]
    fn test_xml_noncharacters_are_stripped_from_docx() {
        let doc = render_document("Go\u{fffe} and Rust\u{ffff}", CvFormat::Docx, "cv.docx").unwrap();
        let parsed = parse_cv_upload("cv.docx", &doc.bytes).unwrap();
        assert_eq!(parsed.text, "Go and Rust");
    }
}

// Document collaborators around the refinement core:
// upload parsing (.docx / .tex → plain text) and rendering (plain text → downloadable file).

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod handlers;
pub mod parse;
pub mod render;

pub use parse::parse_cv_upload;
pub use render::{render_cover_letter, render_document, RenderedDocument};

/// Source format of the uploaded CV. Decides which renderer produces the refined CV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CvFormat {
    Docx,
    Tex,
}

impl CvFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CvFormat::Docx => "docx",
            CvFormat::Tex => "tex",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            CvFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            CvFormat::Tex => "application/x-tex",
        }
    }

    pub fn default_filename(self) -> &'static str {
        match self {
            CvFormat::Docx => "cv.docx",
            CvFormat::Tex => "cv.tex",
        }
    }

    /// Matches a filename's extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(CvFormat::Docx),
            "tex" => Some(CvFormat::Tex),
            _ => None,
        }
    }
}

impl fmt::Display for CvFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(CvFormat::from_filename("resume.DOCX"), Some(CvFormat::Docx));
        assert_eq!(CvFormat::from_filename("cv.final.tex"), Some(CvFormat::Tex));
        assert_eq!(CvFormat::from_filename("resume.pdf"), None);
        assert_eq!(CvFormat::from_filename("resume"), None);
    }

    #[test]
    fn test_format_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CvFormat::Tex).unwrap(), "\"tex\"");
        let parsed: CvFormat = serde_json::from_str("\"docx\"").unwrap();
        assert_eq!(parsed, CvFormat::Docx);
    }
}

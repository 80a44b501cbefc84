//! Line ending and encoding declarations.
//!
//! The engine stores text internally using LF (`'\n'`) newlines. When a
//! document is opened with CRLF (`"\r\n"`) content it is normalized on load,
//! and the preferred convention is tracked so hosts can reapply it on save.

/// The preferred newline sequence used when saving a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
}

impl LineEnding {
    /// Detect the dominant line ending from a source text.
    ///
    /// Policy: any CRLF in the input selects [`LineEnding::Crlf`], otherwise
    /// [`LineEnding::Lf`].
    pub fn detect_in_text(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::Crlf
        } else {
            Self::Lf
        }
    }

    /// Normalize a source text to internal LF form.
    pub fn normalize(text: &str) -> String {
        text.replace("\r\n", "\n")
    }

    /// Convert an LF-normalized text to this line ending for saving.
    pub fn apply_to_text(self, text: &str) -> String {
        match self {
            Self::Lf => text.to_string(),
            Self::Crlf => text.replace('\n', "\r\n"),
        }
    }
}

/// The declared character encoding of a document.
///
/// The engine always works on UTF-8 text in memory; the declared encoding is
/// carried so the host's I/O layer knows how to write the file back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8 (the in-memory working form).
    #[default]
    Utf8,
    /// UTF-8 with a byte-order mark.
    Utf8Bom,
    /// Latin-1 / ISO-8859-1.
    Latin1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_crlf() {
        assert_eq!(LineEnding::detect_in_text("a\r\nb"), LineEnding::Crlf);
        assert_eq!(LineEnding::detect_in_text("a\nb"), LineEnding::Lf);
        assert_eq!(LineEnding::detect_in_text(""), LineEnding::Lf);
    }

    #[test]
    fn normalize_and_reapply() {
        let source = "one\r\ntwo\r\n";
        let normalized = LineEnding::normalize(source);
        assert_eq!(normalized, "one\ntwo\n");
        assert_eq!(LineEnding::Crlf.apply_to_text(&normalized), source);
        assert_eq!(LineEnding::Lf.apply_to_text(&normalized), normalized);
    }
}

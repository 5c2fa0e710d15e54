/// The closed set of document formats we can turn into text, resolved from
/// the MIME type the storage provider reports for a file.
///
/// Detection is an exact string match over a fixed table. No prefix or
/// wildcard matching: `application/pdf;charset=x` is not a PDF to us, and
/// anything outside the table is rejected up front rather than producing
/// empty text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
    Docx,
    Xlsx,
    /// Native Google Docs file. Has no canonical byte encoding, so content
    /// is obtained via server-side export or the structured Docs API.
    GoogleDoc,
}

impl DocumentKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/pdf" => Some(Self::Pdf),
            "text/plain" => Some(Self::PlainText),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(Self::Xlsx)
            }
            "application/vnd.google-apps.document" => Some(Self::GoogleDoc),
            _ => None,
        }
    }

    /// Stable tag used in API responses.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::PlainText => "txt",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::GoogleDoc => "google-doc",
        }
    }
}

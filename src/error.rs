use thiserror::Error;

/// Why an upload attempt could not produce a document.
///
/// Every variant is terminal for the attempt: the session keeps whatever
/// document it already had.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Neither a JSON document nor a ZIP archive.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The archive opened fine but holds no `*.json` entry with `content` in its path.
    #[error("no matching data file in archive ({0} entries scanned)")]
    NoMatchingEntry(usize),

    /// The archive, or the selected entry, could not be read.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// The text is not a parseable export document.
    #[error("malformed document: {0}")]
    MalformedDocument(String),
}

impl LoadError {
    /// Text suitable for showing to the person who picked the file.
    pub fn user_message(&self) -> &'static str {
        match self {
            LoadError::UnsupportedFormat(_) => {
                "Please upload a ZIP file or JSON file from your data export."
            }
            LoadError::NoMatchingEntry(_) => {
                "No export data found in the ZIP file. Please make sure you uploaded the correct export."
            }
            LoadError::CorruptArchive(_) => {
                "Error processing ZIP file. Please make sure it's a valid data export."
            }
            LoadError::MalformedDocument(_) => {
                "Error parsing JSON file. Please make sure it's a valid data export."
            }
        }
    }
}

impl From<zip::result::ZipError> for LoadError {
    fn from(e: zip::result::ZipError) -> Self {
        LoadError::CorruptArchive(e.to_string())
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        LoadError::MalformedDocument(e.to_string())
    }
}

/// A required sub-shape of the document is missing where an accessor needs it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("{collection}[{index}] has no {field}")]
    MissingField {
        collection: &'static str,
        index: usize,
        field: &'static str,
    },

    #[error("{collection}[{index}].conversation[{message}] has no sender")]
    MissingSender {
        collection: &'static str,
        index: usize,
        message: usize,
    },
}

impl From<DocumentError> for LoadError {
    fn from(e: DocumentError) -> Self {
        LoadError::MalformedDocument(e.to_string())
    }
}

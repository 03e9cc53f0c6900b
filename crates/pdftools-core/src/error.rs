use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfToolsError {
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("Failed to load PDF: {0}")]
    DocumentLoad(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl PdfToolsError {
    /// Short heading used when the error is surfaced to the user
    pub fn title(&self) -> &'static str {
        match self {
            PdfToolsError::InvalidFileType(_) => "Invalid file type",
            PdfToolsError::Validation(_) | PdfToolsError::InvalidRange(_) => "Check your input",
            PdfToolsError::Encryption(_) => "Password error",
            _ => "Error",
        }
    }

    /// The message without the variant prefix
    pub fn detail(&self) -> &str {
        match self {
            PdfToolsError::InvalidFileType(msg)
            | PdfToolsError::DocumentLoad(msg)
            | PdfToolsError::Serialization(msg)
            | PdfToolsError::Conversion(msg)
            | PdfToolsError::Validation(msg)
            | PdfToolsError::InvalidRange(msg)
            | PdfToolsError::Encryption(msg)
            | PdfToolsError::Delivery(msg) => msg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_detail() {
        let err = PdfToolsError::InvalidRange("Start 3 > end 1".into());
        assert_eq!(err.to_string(), "Invalid page range: Start 3 > end 1");
        assert_eq!(err.detail(), "Start 3 > end 1");
        assert_eq!(err.title(), "Check your input");
    }

    #[test]
    fn test_validation_displays_bare_message() {
        let err = PdfToolsError::Validation("Please enter a password".into());
        assert_eq!(err.to_string(), "Please enter a password");
    }
}

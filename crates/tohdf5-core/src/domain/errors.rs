use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type IngestResult<T> = Result<T, IngestError>;
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestErrorCategory {
    InputValidationError,
    IoSystemError,
    MalformedRecordError,
    InternalError,
}

impl IngestErrorCategory {
    pub const fn exit_mapping(self) -> ExitMapping {
        match self {
            Self::InputValidationError => ExitMapping {
                exit_code: 2,
                rust_category: "InputError",
            },
            Self::IoSystemError => ExitMapping {
                exit_code: 3,
                rust_category: "IoSystemError",
            },
            Self::MalformedRecordError => ExitMapping {
                exit_code: 4,
                rust_category: "MalformedRecordError",
            },
            Self::InternalError => ExitMapping {
                exit_code: 5,
                rust_category: "InternalError",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_mapping().exit_code
    }

    pub const fn rust_category(self) -> &'static str {
        self.exit_mapping().rust_category
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitMapping {
    pub exit_code: i32,
    pub rust_category: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestError {
    category: IngestErrorCategory,
    code: &'static str,
    message: String,
}

impl IngestError {
    pub fn new(
        category: IngestErrorCategory,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
        }
    }

    pub fn input_validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(IngestErrorCategory::InputValidationError, code, message)
    }

    pub fn io_system(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(IngestErrorCategory::IoSystemError, code, message)
    }

    pub fn malformed_record(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(IngestErrorCategory::MalformedRecordError, code, message)
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(IngestErrorCategory::InternalError, code, message)
    }

    pub const fn category(&self) -> IngestErrorCategory {
        self.category
    }

    pub const fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub const fn is_malformed_record(&self) -> bool {
        matches!(self.category, IngestErrorCategory::MalformedRecordError)
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.code, self.message)
    }

    /// Every error ends the run, so every error has an exit line.
    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.rust_category(),
            self.code,
            self.message
        )
    }
}

impl Error for IngestError {}

/// Non-fatal condition recorded during a run. Empty groups are still written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestWarning {
    pub code: &'static str,
    pub message: String,
}

impl IngestWarning {
    pub fn empty_data(message: impl Into<String>) -> Self {
        Self {
            code: "WARN.EMPTY_DATA",
            message: message.into(),
        }
    }

    pub fn skipped_file(message: impl Into<String>) -> Self {
        Self {
            code: "WARN.SKIPPED_FILE",
            message: message.into(),
        }
    }

    pub fn diagnostic_line(&self) -> String {
        format!("WARNING: [{}] {}", self.code, self.message)
    }
}

impl Display for IngestWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.diagnostic_line())
    }
}

#[cfg(test)]
mod tests {
    use super::{IngestError, IngestErrorCategory, IngestWarning};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (IngestErrorCategory::InputValidationError, 2, "InputError"),
            (IngestErrorCategory::IoSystemError, 3, "IoSystemError"),
            (IngestErrorCategory::MalformedRecordError, 4, "MalformedRecordError"),
            (IngestErrorCategory::InternalError, 5, "InternalError"),
        ];

        for (category, exit_code, rust_category) in cases {
            let mapping = category.exit_mapping();
            assert_eq!(mapping.exit_code, exit_code);
            assert_eq!(mapping.rust_category, rust_category);
        }
    }

    #[test]
    fn every_category_renders_as_an_error_with_an_exit_line() {
        let error = IngestError::internal("INTERNAL.STAGING", "staging file vanished");
        assert_eq!(error.diagnostic_line(), "ERROR: [INTERNAL.STAGING] staging file vanished");
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 5");
        assert_eq!(error.to_string(), "InternalError [INTERNAL.STAGING] staging file vanished");
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = IngestError::malformed_record(
            "FORMAT.RECORD_FRAMING",
            "'e_0.dat' record 2: leading marker 800 != trailing marker 792",
        );

        assert_eq!(error.exit_code(), 4);
        assert!(error.is_malformed_record());
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [FORMAT.RECORD_FRAMING] 'e_0.dat' record 2: leading marker 800 != trailing marker 792"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 4");
    }

    #[test]
    fn warnings_render_with_their_code() {
        let warning = IngestWarning::empty_data("type 'i' has no contributing files");
        assert_eq!(
            warning.to_string(),
            "WARNING: [WARN.EMPTY_DATA] type 'i' has no contributing files"
        );
    }
}

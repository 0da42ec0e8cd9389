use std::error::Error;
use std::fmt::{Display, Formatter};

pub type XrfResult<T> = Result<T, XrfError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XrfErrorCategory {
    Success,
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl XrfErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// Error shared across the core modules and the command line.
///
/// The `placeholder` is a stable, dotted code (for example `INPUT.FILTER_PARAMETERS`) that
/// scripts can match on without parsing the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrfError {
    category: XrfErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl XrfError {
    pub fn new(
        category: XrfErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(XrfErrorCategory::InputValidationError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(XrfErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(XrfErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(XrfErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> XrfErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for XrfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for XrfError {}

impl From<crate::spectrum::SpectrumError> for XrfError {
    fn from(error: crate::spectrum::SpectrumError) -> Self {
        Self::computation("RUN.SPECTRUM_DIMENSIONS", error.to_string())
    }
}

impl From<crate::filter::FilterError> for XrfError {
    fn from(error: crate::filter::FilterError) -> Self {
        Self::input_validation("INPUT.FILTER_PARAMETERS", error.to_string())
    }
}

impl From<crate::peaktable::PeakTableError> for XrfError {
    fn from(error: crate::peaktable::PeakTableError) -> Self {
        Self::internal("SYS.PEAK_TABLE", error.to_string())
    }
}

impl From<crate::config::ConfigError> for XrfError {
    fn from(error: crate::config::ConfigError) -> Self {
        match error {
            crate::config::ConfigError::Read { .. } => {
                Self::io_system("IO.CONFIG_READ", error.to_string())
            }
            _ => Self::input_validation("INPUT.CONFIG", error.to_string()),
        }
    }
}

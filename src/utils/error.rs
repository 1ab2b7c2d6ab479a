use thiserror::Error;

#[derive(Error, Debug)]
pub enum StockError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Manifest parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("{message}")]
    UpstreamError { message: String },

    #[error("{message}")]
    NotFoundError { message: String },

    #[error("{message}")]
    InvalidRequestError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Manifest error in '{service}': {message}")]
    ManifestError { service: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Request,
    Configuration,
    Manifest,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 依嚴重程度決定行程退出碼
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,      // 警告，但成功
            ErrorSeverity::Medium => 2,   // 可重試
            ErrorSeverity::High => 1,     // 設定或清單錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }
}

impl StockError {
    pub fn upstream(message: impl Into<String>) -> Self {
        StockError::UpstreamError {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        StockError::NotFoundError {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        StockError::InvalidRequestError {
            message: message.into(),
        }
    }

    pub fn manifest(service: impl Into<String>, message: impl Into<String>) -> Self {
        StockError::ManifestError {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            StockError::ApiError(_) => ErrorCategory::Network,
            StockError::UpstreamError { .. } | StockError::NotFoundError { .. } => {
                ErrorCategory::Upstream
            }
            StockError::InvalidRequestError { .. } | StockError::SerializationError(_) => {
                ErrorCategory::Request
            }
            StockError::ConfigError { .. }
            | StockError::ConfigValidationError { .. }
            | StockError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            StockError::YamlError(_) | StockError::ManifestError { .. } => {
                ErrorCategory::Manifest
            }
            StockError::IoError(_) | StockError::CsvError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Request => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Manifest => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 暫時性錯誤，值得重試
    pub fn is_retryable(&self) -> bool {
        match self {
            StockError::ApiError(e) => e.is_timeout() || e.is_connect(),
            StockError::UpstreamError { .. } => true,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check network connectivity and that the target service is running"
            }
            ErrorCategory::Upstream => {
                "Verify the stock symbol and that FMP_API_KEY is valid, then retry later"
            }
            ErrorCategory::Request => "Check the request method and parameters",
            ErrorCategory::Configuration => {
                "Review the configuration file, CLI flags and environment variables"
            }
            ErrorCategory::Manifest => {
                "Fix the compose manifest: service names, depends_on targets and port bindings"
            }
            ErrorCategory::System => "Check file paths and permissions",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            StockError::ApiError(e) if e.is_timeout() => "The request timed out".to_string(),
            StockError::ApiError(e) if e.is_connect() => {
                "Could not connect to the server".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StockError>;

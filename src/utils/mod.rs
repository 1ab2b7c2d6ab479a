pub mod env;
pub mod error;
pub mod format;
pub mod logger;
pub mod validation;

//! Pre-flight checks before expensive operations.
//!
//! Validates that required credentials are available before starting
//! operations that would otherwise fail on the first network call.

use crate::config::{ModelProvider, Settings};
use crate::error::{LecternError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions needs the model key and the embeddings key.
    Ask,
    /// Listing courses reads the local store only.
    Courses,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ask => {
            check_api_key(settings.model.provider.api_key_var())?;
            // Query embeddings always go through OpenAI
            if settings.model.provider != ModelProvider::OpenAI {
                check_api_key(ModelProvider::OpenAI.api_key_var())?;
            }
        }
        Operation::Courses => {}
    }
    Ok(())
}

/// Check that an API key environment variable is set and non-empty.
fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(LecternError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(LecternError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

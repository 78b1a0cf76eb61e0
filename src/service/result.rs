use crate::error::{GenerationError, GenerationErrorKind};
use serde::Serialize;

/// Outcome of one generation call.
///
/// `data` is present exactly when the call succeeded and `error` exactly when
/// it failed; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult<T = String> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<GenerationError>,
    cached: bool,
}

impl<T> GenerationResult<T> {
    pub fn fresh(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            cached: false,
        }
    }

    pub fn from_cache(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            cached: true,
        }
    }

    pub fn failure(error: GenerationError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            cached: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&GenerationError> {
        self.error.as_ref()
    }

    pub fn error_kind(&self) -> Option<GenerationErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Convert into a `Result`, pairing the data with the `cached` flag.
    pub fn into_result(self) -> Result<(T, bool), GenerationError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok((data, self.cached)),
            (None, Some(err)) => Err(err),
            (None, None) => Err(GenerationError::empty_response()),
        }
    }
}

impl<T> From<GenerationError> for GenerationResult<T> {
    fn from(err: GenerationError) -> Self {
        Self::failure(err)
    }
}

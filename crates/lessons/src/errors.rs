//! Error taxonomy and the single place failures are classified
//!
//! Everything that can go wrong in the pipeline ends up as a [`LessonError`].
//! [`classify`] decides what the caller does about it: substitute a default,
//! treat the result as absent, or give up on the request.

use thiserror::Error;

use crate::generation::GenerationError;
use crate::input::InputError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum LessonError {
  #[error(transparent)]
  Input(#[from] InputError),

  #[error("Priority normalization failed: {message}")]
  Normalization { message: String },

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Generation(#[from] GenerationError),
}

impl LessonError {
  pub fn normalization(message: impl Into<String>) -> Self {
    Self::Normalization { message: message.into() }
  }
}

/// How a failure is absorbed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
  /// Carry on with a documented default value
  WithDefault,
  /// Carry on as if the thing looked up was not there / not needed
  AsAbsence,
  /// Stop processing this request and report the error
  Fatal,
}

pub fn classify(error: &LessonError) -> Recovery {
  match error {
    LessonError::Normalization { .. } => Recovery::WithDefault,
    LessonError::Store(_) => Recovery::AsAbsence,
    LessonError::Input(_) | LessonError::Generation(_) => Recovery::Fatal,
  }
}

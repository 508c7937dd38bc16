use recon_core::error::CoreError;
use validator::Validate;

use crate::error::AppError;

/// Run the `validator` rules of a request body.
pub fn validate<T: Validate>(value: &T) -> Result<(), AppError> {
    value
        .validate()
        .map_err(|err| AppError::Core(CoreError::Validation(err.to_string())))
}

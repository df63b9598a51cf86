use std::any::Any;
use std::error::Error;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Validates values bound from a request.
///
/// Implementations receive any type and must not panic: a value of a type the validator
/// does not know about should pass.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &dyn Any) -> Result<(), BoxError>;
}

impl<F> Validator for F
where
    F: Fn(&dyn Any) -> Result<(), BoxError> + Send + Sync,
{
    fn validate(&self, value: &dyn Any) -> Result<(), BoxError> {
        self(value)
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
#[error("Validation error: {0}")]
pub struct ValidationError(pub String);

#[macro_export]
macro_rules! invalid {
    ($($arg:tt)+) => {
        $crate::utils::validation::ValidationError(format!($($arg)+))
    };
}

pub trait Validatable {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

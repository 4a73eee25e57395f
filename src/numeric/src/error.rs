use thiserror::Error;

#[derive(Error, Debug)]
pub enum NumericError {
    #[error("Invalid degrees of freedom: {0}")]
    InvalidDf(f64),
}

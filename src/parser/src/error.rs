use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to parse '{value}' within --{arg} as a range or index")]
    InvalidRange { arg: &'static str, value: String },

    #[error("Range '{0}' is reversed: the lower bound must come first")]
    ReversedRange(String),

    #[error("Temporal estimation requires --generations")]
    MissingGenerations,

    #[error("--generations lists {found} times, but the input contains {expected} populations")]
    GenerationCount { expected: usize, found: usize },
}

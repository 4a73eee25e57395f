use thiserror::Error;

pub const GENOTYPE_VALID_FILE_FORMATS: [&str; 3] = ["dat", "gen", "txt"];

fn common_help_msg() -> String {
    format!("Please provide an input file with one of the accepted extensions: {GENOTYPE_VALID_FILE_FORMATS:?}, or force a format with '--input-format'")
}

#[derive(Error, Debug)]
pub enum GenotypeReaderError {
    #[error("Cannot handle genotype file format: {0}. {}", common_help_msg())]
    InvalidFileFormat(String),

    #[error("The genotype file is missing a file extension. {}", common_help_msg())]
    MissingExtension,

    #[error("Failed to open genotype file {0}")]
    OpenFile(String, #[source] std::io::Error),

    #[error("Invalid header: {0}")]
    BadHeader(String),

    #[error("Line {line}: genotype '{token}' does not span {expected} digits")]
    GenotypeWidth { line: usize, token: String, expected: usize },

    #[error("Line {line}: genotype '{token}' contains a non-digit character")]
    NonDigit { line: usize, token: String },

    #[error("Line {line}: individual carries {found} genotypes, expected {expected}")]
    GenotypeCount { line: usize, expected: usize, found: usize },

    #[error("Premature end of file: {0}")]
    PrematureEof(String),

    #[error("The genotype file declares no usable population")]
    EmptyInput,
}

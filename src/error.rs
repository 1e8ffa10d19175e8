use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("window must be a non-negative number of days, got {0}")]
    InvalidWindow(i64),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RatingError {
    #[error("rating {value} for '{category}' is outside -2..=2")]
    OutOfRange { category: String, value: i32 },

    #[error("expected CATEGORY=VALUE, got '{0}'")]
    Malformed(String),

    #[error("category identifier must not be empty")]
    EmptyCategory,

    #[error("unknown category '{0}'; add it with `categories add` first")]
    UnknownCategory(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV is missing a 'date' column")]
    MissingDateColumn,

    #[error("line {line}: invalid date '{value}'")]
    InvalidDate { line: u64, value: String },

    #[error("line {line}: invalid rating '{value}' for '{category}'")]
    InvalidNumber {
        line: u64,
        category: String,
        value: String,
    },

    #[error("line {line}: {source}")]
    Rating {
        line: u64,
        #[source]
        source: RatingError,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

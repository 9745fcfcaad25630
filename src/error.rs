use derive_more::From;

use crate::history::HistoryError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    #[from]
    Json(serde_json::Error),

    #[from]
    Http(reqwest::Error),

    #[from]
    HttpHeader(reqwest::header::InvalidHeaderValue),

    #[from]
    Config(config::ConfigError),

    #[from]
    Email(lettre::error::Error),

    #[from]
    Smtp(lettre::transport::smtp::Error),

    #[from]
    Address(lettre::address::AddressError),

    #[from]
    History(HistoryError),

    #[from]
    Io(std::io::Error),

    /// Mist API answered with a non-success status
    Api { status: u16, url: String },

    /// Custom error message
    Custom(String),
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}

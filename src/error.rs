use std::convert::Infallible;

use crate::trace::TraceError;
use crate::vga::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("line {line}: {source}")]
    Trace {
        line: usize,
        #[source]
        source: TraceError,
    },

    #[error("invalid timing configuration: {0}")]
    Config(#[from] ConfigError),
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;

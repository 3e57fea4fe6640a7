use thiserror::Error;

use crate::config::ConfigError;
use crate::dists::DistsError;
use crate::image::ExportError;
use crate::plot::PlotError;
use crate::stl::StlError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Dists(#[from] DistsError),

    #[error(transparent)]
    Plot(#[from] PlotError),

    #[error(transparent)]
    Stl(#[from] StlError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_module_errors() {
        let err: Error = StlError::TooShort(3).into();
        assert!(matches!(err, Error::Stl(StlError::TooShort(3))));
        assert_eq!(err.to_string(), "file is 3 bytes, shorter than the 84 byte preamble");

        let err: Error = ConfigError::NoMaterials.into();
        assert!(matches!(err, Error::Config(_)));
    }
}

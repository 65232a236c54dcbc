use std::path::PathBuf;

use thiserror::Error;

/// Failure to load a font resource. Only the loaders return this; the
/// shaping and layout stages treat a missing typeface as "render less".
#[derive(Error, Debug)]
pub enum TypefaceError {
    #[error("Failed to read font file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Font data could not be parsed: {0}")]
    Parse(#[from] ttf_parser::FaceParsingError),
    #[error("Face index {index} out of range, collection has {count} faces")]
    InvalidIndex { index: u32, count: u32 },
}

/// Failure to turn an embedded font back into a typeface.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("Invalid glyph path data: {0}")]
    Path(#[from] kurbo::SvgParseError),
    #[error("Glyph image could not be encoded or decoded: {0}")]
    Image(#[from] image::ImageError),
    #[error("Glyph image holds {actual} bytes, expected {expected}")]
    ImageSize { expected: usize, actual: usize },
}

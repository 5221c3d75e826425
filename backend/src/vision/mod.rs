pub mod decode;
pub mod preprocess;

pub use decode::{decode, DecodeError};
pub use preprocess::{batch, preprocess, PreprocessConfig};

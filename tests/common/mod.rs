mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from tablecoco for tests
pub use tablecoco::source::{ManifestAnnotation, ManifestImage};
pub use tablecoco::{
    ConvertError, Converter, ConverterConfig, Dataset, Diagnostic, SourceFormat,
};

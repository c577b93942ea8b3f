pub mod heightmap;

pub use heightmap::{ConversionMode, ConversionRequest, Converter, HeightmapConverter, Reduction};

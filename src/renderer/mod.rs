pub mod differ;
pub mod downscale;
pub mod encoder;
pub mod frame;
pub mod palette;
pub mod processor;
pub mod quantizer;

pub use frame::Frame;
pub use palette::Palette;
pub use processor::{FrameProcessor, ProcessSettings};

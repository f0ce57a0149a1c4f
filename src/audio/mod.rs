pub mod buffer;
pub mod decode;

pub use buffer::{mix_buses, SampleBuffer};
pub use decode::decode_audio;

mod audio;
mod packet;
mod time;

pub use audio::{AudioFormat, AudioFrame, ChannelLayout, PcmChunk, SampleFormat};
pub use packet::{CodecParameters, EncodedPacket};
pub use time::TimeBase;

//! audx Core
//!
//! Format types, capability traits, and error handling shared by the audx
//! transcoding pipeline.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `AudioFormat`, `PcmChunk`, `AudioFrame`, `EncodedPacket`, `TimeBase`
//! - **Capability Traits**: `AudioSource`, `EncoderBackend`, `Muxer`
//! - **Error Handling**: Unified `AudxError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use audx_core::{AudioFormat, AudioFrame, ChannelLayout, SampleFormat};
//!
//! let format = AudioFormat::new(44_100, ChannelLayout::default_for(2), SampleFormat::S16);
//!
//! // 4 stereo samples of s16 = 16 bytes
//! let frame = AudioFrame::new(vec![0u8; 16], format, 4, 0).unwrap();
//! assert_eq!(frame.sample_count(), 4);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{AudxError, ErrorCategory, Result};
pub use traits::{AudioSource, EncoderBackend, Muxer, ReadOutcome};

pub use types::{
    AudioFormat, AudioFrame, ChannelLayout, CodecParameters, EncodedPacket, PcmChunk,
    SampleFormat, TimeBase,
};

/// Capability traits for the transcoding pipeline
use crate::error::Result;
use crate::types::{AudioFormat, AudioFrame, CodecParameters, EncodedPacket, PcmChunk, TimeBase};

/// Result of one [`AudioSource::read`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Next chunk of PCM in the source's output format
    Chunk(PcmChunk),
    /// Nothing produced this call; call again
    Skip,
    /// Source exhausted; every further call returns this too
    EndOfStream,
}

/// Pull-based producer of canonical PCM chunks
///
/// Implementers own the input and hand out chunks one per call.
pub trait AudioSource {
    /// Format of every chunk returned by `read()`
    fn output_format(&self) -> AudioFormat;

    /// Produce the next chunk, a skip, or end-of-stream
    ///
    /// # Errors
    /// Returns an error only for failures that should abort the run
    fn read(&mut self) -> Result<ReadOutcome>;
}

/// Frame-oriented encoder with a send/receive interface
///
/// Frames go in through `send_frame`, packets come out through
/// `receive_packet` until it returns `None`. Sending `None` starts the
/// terminal flush; packets still buffered in the encoder become available.
pub trait EncoderBackend {
    /// Encoder name as used on the command line
    fn name(&self) -> &'static str;

    /// Format every frame passed to `send_frame` must have
    fn input_format(&self) -> AudioFormat;

    /// Required samples per frame, `None` when any length is accepted
    ///
    /// Only the last frame before the flush may be shorter.
    fn frame_size(&self) -> Option<usize>;

    /// Time base of packet timestamps
    fn time_base(&self) -> TimeBase {
        TimeBase::for_sample_rate(self.input_format().sample_rate)
    }

    /// Stream parameters for the container writer
    fn parameters(&self) -> CodecParameters;

    /// Submit a frame, or `None` to flush
    ///
    /// # Errors
    /// Returns an error if the frame is rejected or the encoder was already flushed
    fn send_frame(&mut self, frame: Option<&AudioFrame>) -> Result<()>;

    /// Take the next finished packet, if any
    ///
    /// # Errors
    /// Returns an error if encoding fails
    fn receive_packet(&mut self) -> Result<Option<EncodedPacket>>;
}

/// Container writer for a single audio stream
pub trait Muxer {
    /// Time base packets must be expressed in when passed to `write_packet`
    fn stream_time_base(&self) -> TimeBase;

    /// Write the container header
    ///
    /// # Errors
    /// Returns an error if the header cannot be written
    fn write_header(&mut self) -> Result<()>;

    /// Write one packet, timestamps already in `stream_time_base()`
    ///
    /// # Errors
    /// Returns an error if the packet cannot be written
    fn write_packet(&mut self, packet: &EncodedPacket) -> Result<()>;

    /// Write the trailer and flush the output
    ///
    /// # Errors
    /// Returns an error if the trailer cannot be written
    fn write_trailer(&mut self) -> Result<()>;
}

use audx_core::{AudxError, CodecParameters, EncodedPacket, Muxer, Result, TimeBase};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Writes packet payloads back to back with no framing
pub struct RawMuxer {
    writer: Option<BufWriter<File>>,
    time_base: TimeBase,
    bytes_written: u64,
}

impl RawMuxer {
    pub fn create(path: &Path, params: &CodecParameters) -> Result<Self> {
        let file = File::create(path).map_err(|e| {
            AudxError::container(format!("cannot create '{}': {}", path.display(), e))
        })?;
        Ok(Self {
            writer: Some(BufWriter::new(file)),
            time_base: TimeBase::for_sample_rate(params.format.sample_rate),
            bytes_written: 0,
        })
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| AudxError::invalid_state("raw output already closed"))
    }
}

impl Muxer for RawMuxer {
    fn stream_time_base(&self) -> TimeBase {
        self.time_base
    }

    fn write_header(&mut self) -> Result<()> {
        self.writer().map(|_| ())
    }

    fn write_packet(&mut self, packet: &EncodedPacket) -> Result<()> {
        self.writer()?
            .write_all(&packet.data)
            .map_err(|e| AudxError::container(format!("write failed: {}", e)))?;
        self.bytes_written += packet.data.len() as u64;
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| AudxError::invalid_state("raw output already closed"))?;
        writer
            .flush()
            .map_err(|e| AudxError::container(format!("flush failed: {}", e)))?;
        debug!(bytes = self.bytes_written, "Raw stream closed");
        Ok(())
    }
}

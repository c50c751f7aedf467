//! Ogg encapsulation for Opus
//!
//! Two header pages (`OpusHead`, `OpusTags`) followed by one audio packet per
//! Opus frame. The last packet is held back so it can close the stream.

use audx_core::{AudxError, CodecParameters, EncodedPacket, Muxer, Result, TimeBase};
use ogg::writing::{PacketWriteEndInfo, PacketWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Granule positions count 48 kHz samples
const GRANULE_RATE: u32 = 48_000;

const VENDOR: &str = concat!("audx ", env!("CARGO_PKG_VERSION"));

pub struct OggMuxer {
    writer: Option<PacketWriter<'static, BufWriter<File>>>,
    serial: u32,
    head: Vec<u8>,
    held: Option<(Vec<u8>, u64)>,
}

impl OggMuxer {
    pub fn create(path: &Path, params: &CodecParameters) -> Result<Self> {
        if params.codec_name != "libopus" || !params.extradata.starts_with(b"OpusHead") {
            return Err(AudxError::UnsupportedFormat(format!(
                "Ogg cannot carry {}",
                params.codec_name
            )));
        }
        let file = File::create(path).map_err(|e| {
            AudxError::container(format!("cannot create '{}': {}", path.display(), e))
        })?;

        // Any value unique within the file works for a single stream
        let serial = u32::from_le_bytes(*b"audx");

        Ok(Self {
            writer: Some(PacketWriter::new(BufWriter::new(file))),
            serial,
            head: params.extradata.clone(),
            held: None,
        })
    }

    fn opus_tags() -> Vec<u8> {
        let mut tags = Vec::with_capacity(8 + 4 + VENDOR.len() + 4);
        tags.extend_from_slice(b"OpusTags");
        tags.extend_from_slice(&(VENDOR.len() as u32).to_le_bytes());
        tags.extend_from_slice(VENDOR.as_bytes());
        tags.extend_from_slice(&0u32.to_le_bytes());
        tags
    }

    fn write(&mut self, data: Vec<u8>, end: PacketWriteEndInfo, granule: u64) -> Result<()> {
        let serial = self.serial;
        self.writer
            .as_mut()
            .ok_or_else(|| AudxError::invalid_state("Ogg output already closed"))?
            .write_packet(data, serial, end, granule)
            .map_err(|e| AudxError::container(format!("Ogg write failed: {}", e)))
    }
}

impl Muxer for OggMuxer {
    fn stream_time_base(&self) -> TimeBase {
        TimeBase::for_sample_rate(GRANULE_RATE)
    }

    fn write_header(&mut self) -> Result<()> {
        let head = std::mem::take(&mut self.head);
        self.write(head, PacketWriteEndInfo::EndPage, 0)?;
        self.write(Self::opus_tags(), PacketWriteEndInfo::EndPage, 0)
    }

    fn write_packet(&mut self, packet: &EncodedPacket) -> Result<()> {
        let granule = (packet.pts + packet.duration).max(0) as u64;
        if let Some((data, granule)) = self.held.replace((packet.data.clone(), granule)) {
            self.write(data, PacketWriteEndInfo::NormalPacket, granule)?;
        }
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        let (data, granule) = self.held.take().unwrap_or_default();
        self.write(data, PacketWriteEndInfo::EndStream, granule)?;

        let writer = self
            .writer
            .take()
            .ok_or_else(|| AudxError::invalid_state("Ogg output already closed"))?;
        writer
            .into_inner()
            .flush()
            .map_err(|e| AudxError::container(format!("flush failed: {}", e)))
    }
}

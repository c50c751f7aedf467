use crate::conversion::sample::s16_values;
use audx_core::{AudxError, CodecParameters, EncodedPacket, Muxer, Result, TimeBase};
use hound::{WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// WAV writer for `pcm_s16le` packets
pub struct WavMuxer {
    writer: Option<WavWriter<BufWriter<File>>>,
    time_base: TimeBase,
}

impl WavMuxer {
    pub fn create(path: &Path, params: &CodecParameters) -> Result<Self> {
        if params.codec_name != "pcm_s16le" {
            return Err(AudxError::UnsupportedFormat(format!(
                "WAV cannot carry {}",
                params.codec_name
            )));
        }
        let spec = WavSpec {
            channels: params.format.layout.channels(),
            sample_rate: params.format.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = WavWriter::create(path, spec).map_err(|e| {
            AudxError::container(format!("cannot create '{}': {}", path.display(), e))
        })?;
        Ok(Self {
            writer: Some(writer),
            time_base: TimeBase::for_sample_rate(params.format.sample_rate),
        })
    }
}

impl Muxer for WavMuxer {
    fn stream_time_base(&self) -> TimeBase {
        self.time_base
    }

    fn write_header(&mut self) -> Result<()> {
        // hound writes the header on creation
        Ok(())
    }

    fn write_packet(&mut self, packet: &EncodedPacket) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| AudxError::invalid_state("WAV output already closed"))?;
        for s in s16_values(&packet.data) {
            writer
                .write_sample(s)
                .map_err(|e| AudxError::container(format!("WAV write failed: {}", e)))?;
        }
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| AudxError::invalid_state("WAV output already closed"))?;
        writer
            .finalize()
            .map_err(|e| AudxError::container(format!("WAV finalize failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audx_core::AudioFormat;

    #[test]
    fn writes_readable_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let params = CodecParameters {
            codec_name: "pcm_s16le",
            format: AudioFormat::cd_quality(),
            bit_rate: None,
            initial_padding: 0,
            extradata: Vec::new(),
        };
        let mut mux = WavMuxer::create(&path, &params).unwrap();
        mux.write_header().unwrap();
        let data: Vec<u8> = [1i16, -1, 300, -300].iter().flat_map(|s| s.to_le_bytes()).collect();
        mux.write_packet(&EncodedPacket::new(data, 0, 2)).unwrap();
        mux.write_trailer().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 44_100);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, -1, 300, -300]);
    }
}

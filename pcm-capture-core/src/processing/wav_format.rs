//! WAV file format utilities.
//!
//! Builds and parses the canonical 44-byte RIFF/WAVE header for linear PCM.

use crate::models::audio_models::PcmFormat;
use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest `data` chunk whose RIFF chunk size (`36 + data_size`) still fits in 32 bits.
pub const MAX_DATA_SIZE: u32 = u32::MAX - 36;

const PCM_FORMAT_CODE: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;

/// The four values a canonical PCM header is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: PcmFormat,
    pub data_size: u32,
}

impl WavHeader {
    /// Validate parameters and build a header description.
    pub fn new(format: PcmFormat, data_size: u64) -> Result<Self, CaptureError> {
        format.validate()?;
        if data_size > MAX_DATA_SIZE as u64 {
            return Err(CaptureError::InvalidParameters(format!(
                "data size {} exceeds RIFF limit {}",
                data_size, MAX_DATA_SIZE
            )));
        }
        Ok(Self {
            format,
            data_size: data_size as u32,
        })
    }

    /// RIFF chunk size: everything after the first 8 bytes.
    pub fn chunk_size(&self) -> u32 {
        36 + self.data_size
    }

    pub fn to_bytes(&self) -> [u8; WAV_HEADER_SIZE] {
        generate_wav_header(
            self.format.sample_rate,
            self.format.bits_per_sample,
            self.format.channels,
            self.data_size,
        )
    }

    /// Decode a canonical 44-byte header.
    ///
    /// Rejects anything that is not plain PCM with a 16-byte `fmt ` chunk
    /// immediately followed by `data`, or whose derived fields disagree.
    pub fn parse(bytes: &[u8]) -> Result<Self, CaptureError> {
        if bytes.len() < WAV_HEADER_SIZE {
            return Err(CaptureError::InvalidParameters(format!(
                "header needs {} bytes, got {}",
                WAV_HEADER_SIZE,
                bytes.len()
            )));
        }
        expect_tag(bytes, 0, b"RIFF")?;
        expect_tag(bytes, 8, b"WAVE")?;
        expect_tag(bytes, 12, b"fmt ")?;
        expect_tag(bytes, 36, b"data")?;

        if read_u32(bytes, 16) != FMT_CHUNK_SIZE {
            return Err(CaptureError::InvalidParameters(
                "fmt chunk is not 16 bytes".into(),
            ));
        }
        if read_u16(bytes, 20) != PCM_FORMAT_CODE {
            return Err(CaptureError::InvalidParameters(format!(
                "audio format {} is not PCM",
                read_u16(bytes, 20)
            )));
        }

        let format = PcmFormat::new(read_u32(bytes, 24), read_u16(bytes, 22), read_u16(bytes, 34));
        let header = Self::new(format, read_u32(bytes, 40) as u64)?;

        if read_u32(bytes, 4) != header.chunk_size() {
            return Err(CaptureError::InvalidParameters(format!(
                "chunk size {} does not match data size {}",
                read_u32(bytes, 4),
                header.data_size
            )));
        }
        if read_u32(bytes, 28) != format.byte_rate() {
            return Err(CaptureError::InvalidParameters(format!(
                "byte rate {} does not match format",
                read_u32(bytes, 28)
            )));
        }
        if read_u16(bytes, 32) != format.block_align() {
            return Err(CaptureError::InvalidParameters(format!(
                "block align {} does not match format",
                read_u16(bytes, 32)
            )));
        }
        Ok(header)
    }
}

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
///
/// Callers are expected to have validated the parameters; use
/// [`WavHeader::new`] for checked construction.
pub fn generate_wav_header(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let bytes_per_sample = bit_depth / 8;
    let byte_rate = sample_rate
        .wrapping_mul(channels as u32)
        .wrapping_mul(bytes_per_sample as u32);
    let block_align = channels.wrapping_mul(bytes_per_sample);
    let chunk_size = data_size.wrapping_add(36);

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    header[20..22].copy_from_slice(&PCM_FORMAT_CODE.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

fn expect_tag(bytes: &[u8], offset: usize, tag: &[u8; 4]) -> Result<(), CaptureError> {
    if &bytes[offset..offset + 4] != tag {
        return Err(CaptureError::InvalidParameters(format!(
            "expected {:?} at offset {}",
            String::from_utf8_lossy(tag),
            offset
        )));
    }
    Ok(())
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

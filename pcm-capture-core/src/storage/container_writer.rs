use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::PcmFormat;
use crate::models::error::CaptureError;
use crate::processing::wav_format::{WavHeader, WAV_HEADER_SIZE};

/// Copy buffer used when streaming the raw payload into the container.
pub const COPY_BUFFER_SIZE: usize = 4096;

/// A WAV file published by [`finalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedWav {
    pub path: PathBuf,
    pub data_size: u32,
    /// SHA-256 hex digest of the whole WAV file, header included.
    pub checksum: String,
}

impl FinalizedWav {
    pub fn file_size(&self) -> u64 {
        WAV_HEADER_SIZE as u64 + self.data_size as u64
    }
}

/// Wrap the raw PCM stream at `raw_path` in a WAV container at `out_path`.
///
/// The header is computed from the raw file's length at call time, so the
/// capture session writing it must already be closed. Output is assembled at
/// `<out_path>.partial` and renamed into place only after every byte has been
/// written and synced; on failure the partial file is removed and any
/// existing `out_path` is left untouched.
pub fn finalize(raw_path: &Path, out_path: &Path, format: &PcmFormat) -> Result<FinalizedWav, CaptureError> {
    finalize_with_writer(raw_path, out_path, format, |partial_path, header| {
        write_container(raw_path, partial_path, header)
    })
}

/// [`finalize`] with the container assembly step supplied by the caller.
fn finalize_with_writer<F>(
    raw_path: &Path,
    out_path: &Path,
    format: &PcmFormat,
    write: F,
) -> Result<FinalizedWav, CaptureError>
where
    F: FnOnce(&Path, &WavHeader) -> Result<String, CaptureError>,
{
    let data_size = fs::metadata(raw_path)
        .map_err(|e| CaptureError::io("failed to stat raw stream", e))?
        .len();
    let header = WavHeader::new(*format, data_size)?;

    let partial_path = partial_path_for(out_path);
    let result = write(&partial_path, &header).and_then(|checksum| {
        fs::rename(&partial_path, out_path)
            .map_err(|e| CaptureError::io("failed to publish wav", e))?;
        Ok(checksum)
    });

    match result {
        Ok(checksum) => {
            log::info!(
                "Finalized {} ({} data bytes, {} Hz, {} ch, {} bit)",
                out_path.display(),
                header.data_size,
                format.sample_rate,
                format.channels,
                format.bits_per_sample
            );
            Ok(FinalizedWav {
                path: out_path.to_path_buf(),
                data_size: header.data_size,
                checksum,
            })
        }
        Err(e) => {
            if partial_path.exists() {
                if let Err(rm) = fs::remove_file(&partial_path) {
                    log::warn!("Failed to remove {}: {}", partial_path.display(), rm);
                }
            }
            log::error!("Finalize of {} failed: {}", out_path.display(), e);
            Err(e)
        }
    }
}

/// Path the container is assembled at before being renamed over `out_path`.
pub fn partial_path_for(out_path: &Path) -> PathBuf {
    let mut name = out_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("recording.wav"));
    name.push(".partial");
    out_path.with_file_name(name)
}

fn write_container(raw_path: &Path, partial_path: &Path, header: &WavHeader) -> Result<String, CaptureError> {
    if let Some(parent) = partial_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CaptureError::io("failed to create directory", e))?;
    }

    let mut input = File::open(raw_path).map_err(|e| CaptureError::io("failed to open raw stream", e))?;
    let mut output =
        File::create(partial_path).map_err(|e| CaptureError::io("failed to create wav", e))?;
    let mut hasher = Sha256::new();

    let header_bytes = header.to_bytes();
    output
        .write_all(&header_bytes)
        .map_err(|e| CaptureError::io("failed to write wav header", e))?;
    hasher.update(header_bytes);

    let mut buf = [0u8; COPY_BUFFER_SIZE];
    let mut copied: u64 = 0;
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CaptureError::io("failed to read raw stream", e)),
        };
        output
            .write_all(&buf[..n])
            .map_err(|e| CaptureError::io("failed to write wav payload", e))?;
        hasher.update(&buf[..n]);
        copied += n as u64;
    }

    if copied != header.data_size as u64 {
        return Err(CaptureError::IoFailure(format!(
            "raw stream changed during finalize: header says {} bytes, copied {}",
            header.data_size, copied
        )));
    }

    output
        .sync_all()
        .map_err(|e| CaptureError::io("failed to sync wav", e))?;

    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_u32(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
    }

    fn raw_fixture(dir: &Path, len: usize) -> (PathBuf, Vec<u8>) {
        let path = dir.join("take.pcm");
        let data: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        fs::write(&path, &data).unwrap();
        (path, data)
    }

    #[test]
    fn wraps_payload_after_header() {
        let dir = tempfile::tempdir().unwrap();
        // spans several copy buffers plus a remainder
        let (raw, data) = raw_fixture(dir.path(), COPY_BUFFER_SIZE * 3 + 122);
        let out = dir.path().join("take.wav");

        let wav = finalize(&raw, &out, &PcmFormat::stereo_48k()).unwrap();

        let bytes = fs::read(&out).unwrap();
        assert_eq!(bytes.len(), data.len() + 44);
        assert_eq!(&bytes[44..], &data[..]);
        assert_eq!(wav.data_size as usize, data.len());
        assert_eq!(wav.file_size(), bytes.len() as u64);

        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.format, PcmFormat::stereo_48k());
        assert_eq!(header.data_size as usize, data.len());
        assert!(!partial_path_for(&out).exists());
        assert!(raw.exists());
    }

    #[test]
    fn empty_raw_stream_gives_header_only_wav() {
        let dir = tempfile::tempdir().unwrap();
        let (raw, _) = raw_fixture(dir.path(), 0);
        let out = dir.path().join("empty.wav");

        let wav = finalize(&raw, &out, &PcmFormat::mono_48k()).unwrap();

        let bytes = fs::read(&out).unwrap();
        assert_eq!(bytes.len(), 44);
        assert_eq!(le_u32(&bytes, 4), 36);
        assert_eq!(le_u32(&bytes, 40), 0);
        assert_eq!(wav.data_size, 0);
    }

    #[test]
    fn mono_48k_example_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (raw, _) = raw_fixture(dir.path(), 96000);
        let out = dir.path().join("one_second.wav");

        finalize(&raw, &out, &PcmFormat::mono_48k()).unwrap();

        let bytes = fs::read(&out).unwrap();
        assert_eq!(le_u32(&bytes, 4), 96036);
        assert_eq!(le_u32(&bytes, 28), 96000);
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 2);
    }

    #[test]
    fn finalize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (raw, _) = raw_fixture(dir.path(), 10_000);
        let out = dir.path().join("take.wav");

        let first = finalize(&raw, &out, &PcmFormat::stereo_48k()).unwrap();
        let first_bytes = fs::read(&out).unwrap();
        let second = finalize(&raw, &out, &PcmFormat::stereo_48k()).unwrap();
        let second_bytes = fs::read(&out).unwrap();

        assert_eq!(first_bytes, second_bytes);
        assert_eq!(first.checksum, second.checksum);
    }

    #[test]
    fn checksum_covers_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let (raw, _) = raw_fixture(dir.path(), 1000);
        let out = dir.path().join("take.wav");

        let wav = finalize(&raw, &out, &PcmFormat::stereo_48k()).unwrap();

        let expected = hex_encode(&Sha256::digest(fs::read(&out).unwrap()));
        assert_eq!(wav.checksum, expected);
        assert_eq!(wav.checksum.len(), 64);
    }

    #[test]
    fn missing_raw_stream_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("take.wav");

        let err = finalize(&dir.path().join("absent.pcm"), &out, &PcmFormat::mono_48k()).unwrap_err();

        assert!(matches!(err, CaptureError::IoFailure(_)));
        assert!(!out.exists());
        assert!(!partial_path_for(&out).exists());
    }

    #[test]
    fn invalid_format_leaves_existing_output_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (raw, _) = raw_fixture(dir.path(), 16);
        let out = dir.path().join("take.wav");
        fs::write(&out, b"previous").unwrap();

        let err = finalize(&raw, &out, &PcmFormat::new(48000, 0, 16)).unwrap_err();

        assert!(matches!(err, CaptureError::InvalidParameters(_)));
        assert_eq!(fs::read(&out).unwrap(), b"previous");
    }

    #[test]
    fn oversized_block_align_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let (raw, _) = raw_fixture(dir.path(), 8);
        let out = dir.path().join("take.wav");

        let err = finalize(&raw, &out, &PcmFormat::new(8000, 32768, 16)).unwrap_err();

        assert!(matches!(err, CaptureError::InvalidParameters(_)));
        assert!(!out.exists());
        assert!(!partial_path_for(&out).exists());
    }

    #[test]
    fn raw_stream_length_change_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (raw, _) = raw_fixture(dir.path(), 1000);
        let out = dir.path().join("take.wav");
        let partial = partial_path_for(&out);

        // header computed from a stale length
        let header = WavHeader::new(PcmFormat::stereo_48k(), 996).unwrap();
        let err = write_container(&raw, &partial, &header).unwrap_err();
        assert!(matches!(err, CaptureError::IoFailure(_)));

        // finalize cleans the partial file up and leaves the old output alone
        fs::write(&out, b"previous").unwrap();
        fs::remove_file(&partial).unwrap();
        let mut grown = fs::OpenOptions::new().append(true).open(&raw).unwrap();
        let result = finalize_with_writer(&raw, &out, &PcmFormat::stereo_48k(), |partial, header| {
            grown.write_all(&[0u8; 4]).unwrap();
            write_container(&raw, partial, header)
        });

        assert!(matches!(result, Err(CaptureError::IoFailure(_))));
        assert!(!partial_path_for(&out).exists());
        assert_eq!(fs::read(&out).unwrap(), b"previous");
    }

    #[test]
    fn partial_path_is_a_sibling() {
        let out = Path::new("/tmp/recordings/take.wav");
        assert_eq!(
            partial_path_for(out),
            PathBuf::from("/tmp/recordings/take.wav.partial")
        );
    }
}

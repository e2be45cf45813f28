//! PCM conversion and WAV encoding.
//!
//! Pure functions — no I/O, no async runtime.

use crate::types::AudioFormat;

/// Decode little-endian `f32` samples as returned by the synthesis engine.
pub fn f32_samples_from_le_bytes(bytes: &[u8]) -> Result<Vec<f32>, &'static str> {
    if bytes.len() % 4 != 0 {
        return Err("sample buffer length is not a multiple of 4");
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Scale float samples in `[-1.0, 1.0]` to 16-bit, clamping overshoot.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
        .collect()
}

/// 16-bit samples as little-endian bytes.
pub fn pcm16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }
    buf
}

/// Little-endian bytes back to 16-bit samples. A trailing odd byte is dropped.
pub fn pcm16_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Playback length of `byte_len` bytes of raw audio.
pub fn duration_secs(byte_len: usize, format: &AudioFormat) -> f64 {
    let per_second = format.bytes_per_second();
    if per_second == 0 {
        return 0.0;
    }
    byte_len as f64 / per_second as f64
}

/// Write a minimal WAV file (16-bit mono PCM) from raw samples.
pub fn write_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let file_len = 36 + data_len;
    let mut buf = Vec::with_capacity(44 + data_len as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_len.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    buf.extend_from_slice(&2u16.to_le_bytes()); // block align
    buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    buf.extend_from_slice(&pcm16_to_le_bytes(samples));

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_conversion_scales_and_clamps() {
        let pcm = float_to_pcm16(&[0.0, 1.0, -1.0, 0.5, 1.5, -2.0]);
        assert_eq!(pcm, vec![0, 32767, -32767, 16383, 32767, -32768]);
    }

    #[test]
    fn decodes_f32_le() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.25f32.to_le_bytes());
        bytes.extend_from_slice(&(-1.0f32).to_le_bytes());
        assert_eq!(f32_samples_from_le_bytes(&bytes).unwrap(), vec![0.25, -1.0]);
    }

    #[test]
    fn rejects_truncated_f32_buffer() {
        assert!(f32_samples_from_le_bytes(&[0, 0, 0]).is_err());
        assert!(f32_samples_from_le_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn pcm16_bytes_are_little_endian() {
        let bytes = pcm16_to_le_bytes(&[1, 32767, -2]);
        assert_eq!(bytes, vec![0x01, 0x00, 0xFF, 0x7F, 0xFE, 0xFF]);
        assert_eq!(pcm16_from_le_bytes(&bytes), vec![1, 32767, -2]);
        assert_eq!(pcm16_from_le_bytes(&[0x01, 0x00, 0x42]), vec![1]);
    }

    #[test]
    fn duration_of_one_second() {
        let format = AudioFormat::pcm16_mono(48_000);
        assert_eq!(duration_secs(96_000, &format), 1.0);
        assert_eq!(duration_secs(0, &format), 0.0);
    }

    #[test]
    fn write_wav_produces_valid_header() {
        let samples = vec![0i16; 100];
        let wav = write_wav(&samples, 48_000);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 48_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(wav.len(), 44 + 200); // 44 header + 100 samples * 2 bytes
    }
}

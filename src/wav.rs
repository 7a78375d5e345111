//! RIFF/WAVE serialization for raw PCM.
//!
//! Produces the canonical 44-byte header (`RIFF` / `fmt ` / `data`) followed
//! by the sample bytes unchanged.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, SubburnError};

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Largest PCM payload whose RIFF size (`36 + data`) still fits in a u32.
pub const MAX_DATA_LEN: usize = (u32::MAX - 36) as usize;

/// Format triple describing the PCM payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// 16 kHz mono signed 16-bit, the transcription input format.
    pub const SPEECH: PcmFormat = PcmFormat {
        sample_rate: 16_000,
        channels: 1,
        bits_per_sample: 16,
    };

    /// `channels · bits / 8`
    pub fn block_align(&self) -> u16 {
        (self.channels as u64 * self.bits_per_sample as u64 / 8) as u16
    }

    /// `sample_rate · channels · bits / 8`
    pub fn byte_rate(&self) -> u32 {
        (self.sample_rate as u64 * self.channels as u64 * self.bits_per_sample as u64 / 8) as u32
    }
}

/// Data chunk size for `len` PCM bytes, if a WAV header can describe it.
fn data_chunk_len(len: usize) -> Result<u32> {
    if len > MAX_DATA_LEN {
        return Err(SubburnError::Decode(format!(
            "{} bytes of PCM exceed the 4 GiB WAV limit",
            len
        )));
    }
    Ok(len as u32)
}

/// Serialize `pcm` into a complete WAV file. Fails if the PCM is too large
/// for the 32-bit RIFF sizes.
pub fn encode(pcm: &[u8], sample_rate: u32, channels: u16, bits_per_sample: u16) -> Result<Bytes> {
    let format = PcmFormat {
        sample_rate,
        channels,
        bits_per_sample,
    };
    let data_len = data_chunk_len(pcm.len())?;

    let mut buf = BytesMut::with_capacity(WAV_HEADER_LEN + pcm.len());
    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + data_len);
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(FMT_CHUNK_LEN);
    buf.put_u16_le(PCM_FORMAT_TAG);
    buf.put_u16_le(format.channels);
    buf.put_u32_le(format.sample_rate);
    buf.put_u32_le(format.byte_rate());
    buf.put_u16_le(format.block_align());
    buf.put_u16_le(format.bits_per_sample);

    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    buf.put_slice(pcm);

    Ok(buf.freeze())
}

/// Fields of a canonical 44-byte WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub format_tag: u16,
    pub format: PcmFormat,
    pub byte_rate: u32,
    pub block_align: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Parse the header produced by [`encode`]. Returns `None` for anything
    /// that isn't a canonical PCM header.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < WAV_HEADER_LEN {
            return None;
        }
        let mut buf = &bytes[..WAV_HEADER_LEN];

        if &buf[..4] != b"RIFF" {
            return None;
        }
        buf.advance(4);
        let riff_size = buf.get_u32_le();
        if &buf[..8] != b"WAVEfmt " {
            return None;
        }
        buf.advance(8);
        if buf.get_u32_le() != FMT_CHUNK_LEN {
            return None;
        }
        let format_tag = buf.get_u16_le();
        let channels = buf.get_u16_le();
        let sample_rate = buf.get_u32_le();
        let byte_rate = buf.get_u32_le();
        let block_align = buf.get_u16_le();
        let bits_per_sample = buf.get_u16_le();
        if &buf[..4] != b"data" {
            return None;
        }
        buf.advance(4);
        let data_size = buf.get_u32_le();

        Some(Self {
            riff_size,
            format_tag,
            format: PcmFormat {
                sample_rate,
                channels,
                bits_per_sample,
            },
            byte_rate,
            block_align,
            data_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_follow_pcm_length() {
        for n in [0usize, 2, 32_000, 12_345] {
            let pcm = vec![0x5au8; n];
            let wav = encode(&pcm, 16_000, 1, 16).unwrap();
            assert_eq!(wav.len(), 44 + n);

            let header = WavHeader::parse(&wav).unwrap();
            assert_eq!(header.riff_size as usize, 36 + n);
            assert_eq!(header.data_size as usize, n);
            assert_eq!(&wav[44..], &pcm[..]);
        }
    }

    #[test]
    fn test_speech_header_bytes() {
        let wav = encode(&[1, 0, 2, 0], 16_000, 1, 16).unwrap();
        let expected: [u8; 44] = [
            b'R', b'I', b'F', b'F', 40, 0, 0, 0, b'W', b'A', b'V', b'E', //
            b'f', b'm', b't', b' ', 16, 0, 0, 0, 1, 0, 1, 0, //
            0x80, 0x3e, 0, 0, // 16000
            0x00, 0x7d, 0, 0, // 32000
            2, 0, 16, 0, //
            b'd', b'a', b't', b'a', 4, 0, 0, 0,
        ];
        assert_eq!(&wav[..44], &expected[..]);
    }

    #[test]
    fn test_stereo_rates() {
        let format = PcmFormat {
            sample_rate: 44_100,
            channels: 2,
            bits_per_sample: 16,
        };
        assert_eq!(format.byte_rate(), 176_400);
        assert_eq!(format.block_align(), 4);

        let header = WavHeader::parse(&encode(&[], 44_100, 2, 16).unwrap()).unwrap();
        assert_eq!(header.byte_rate, 176_400);
        assert_eq!(header.format_tag, 1);
    }

    #[test]
    fn test_rates_for_packed_odd_depths() {
        let twelve = WavHeader::parse(&encode(&[], 16_000, 1, 12).unwrap()).unwrap();
        assert_eq!(twelve.byte_rate, 24_000);
        assert_eq!(twelve.block_align, 1);

        let twenty = PcmFormat {
            sample_rate: 48_000,
            channels: 2,
            bits_per_sample: 20,
        };
        assert_eq!(twenty.byte_rate(), 240_000);
        assert_eq!(twenty.block_align(), 5);
    }

    #[test]
    fn test_oversized_pcm_is_rejected() {
        assert_eq!(data_chunk_len(MAX_DATA_LEN).unwrap(), u32::MAX - 36);
        let err = data_chunk_len(MAX_DATA_LEN + 1).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DecodeError);
        assert!(data_chunk_len(usize::MAX).is_err());
    }

    #[test]
    fn test_parse_rejects_short_or_foreign_data() {
        assert!(WavHeader::parse(b"RIFF").is_none());
        let mut wav = encode(&[0; 8], 16_000, 1, 16).unwrap().to_vec();
        wav[8] = b'X';
        assert!(WavHeader::parse(&wav).is_none());
    }
}

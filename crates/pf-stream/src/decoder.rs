//! Inbound frame decoding.
//!
//! The feed normally sends plain JSON text frames. Even with compression
//! turned off in the subscription it may still send a zlib stream, written
//! into a text frame one byte per character (each byte becomes the character
//! with that code point). [`FrameDecoder`] handles both:
//!
//! 1. Parse the frame as JSON. Success is the common path.
//! 2. Otherwise turn each character back into a byte (code point `& 0xFF`),
//!    inflate, decode as UTF-8 and parse again.
//!
//! Anything that fails both is [`Decoded::Undecodable`]; errors never escape.

use std::io::Read;

use flate2::{Decompress, FlushDecompress, Status, read::GzDecoder};
use pf_core::error::FeedError;
use serde_json::Value;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One inbound frame as delivered by the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Result of decoding a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Message(Value),
    Undecodable,
}

impl Decoded {
    pub fn into_message(self) -> Option<Value> {
        match self {
            Decoded::Message(v) => Some(v),
            Decoded::Undecodable => None,
        }
    }
}

/// Decompression capability.
pub trait Inflate: Send {
    fn inflate(&self, bytes: &[u8]) -> Result<Vec<u8>, FeedError>;
}

/// zlib inflate via `flate2`; gzip streams (`1f 8b` magic) are detected and
/// handled too. A truncated stream is an error, not partial output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZlibInflate;

impl Inflate for ZlibInflate {
    fn inflate(&self, bytes: &[u8]) -> Result<Vec<u8>, FeedError> {
        if bytes.starts_with(&GZIP_MAGIC) {
            let mut out = Vec::new();
            GzDecoder::new(bytes).read_to_end(&mut out).map_err(|e| FeedError::Inflate(e.to_string()))?;
            return Ok(out);
        }
        inflate_zlib(bytes)
    }
}

fn inflate_zlib(bytes: &[u8]) -> Result<Vec<u8>, FeedError> {
    let mut d = Decompress::new(true);
    let mut out = Vec::with_capacity(bytes.len().saturating_mul(4).max(256));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
        }
        let (in_before, out_before) = (d.total_in(), d.total_out());
        let consumed = in_before as usize;
        let status = d
            .decompress_vec(&bytes[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| FeedError::Inflate(e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                let progressed = d.total_in() != in_before || d.total_out() != out_before;
                if !progressed && out.len() < out.capacity() {
                    return Err(FeedError::Inflate("truncated deflate stream".into()));
                }
            }
        }
    }
}

/// Reinterpret each character of `text` as one byte (code point masked to
/// 8 bits).
pub fn text_to_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|c| (c as u32 & 0xFF) as u8).collect()
}

/// Stateless frame decoder.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder<I = ZlibInflate> {
    inflater: I,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self { inflater: ZlibInflate }
    }
}

impl<I: Inflate> FrameDecoder<I> {
    /// Use a custom decompression implementation.
    pub fn with_inflater(inflater: I) -> Self {
        Self { inflater }
    }

    pub fn decode(&self, frame: &Frame) -> Decoded {
        match frame {
            Frame::Text(text) => self.decode_text(text),
            Frame::Binary(data) => {
                // No binary framing is defined by the feed.
                debug!("binary frame ({} bytes) not supported, discarding", data.len());
                Decoded::Undecodable
            }
        }
    }

    pub fn decode_text(&self, text: &str) -> Decoded {
        if let Ok(v) = serde_json::from_str::<Value>(text) {
            return Decoded::Message(v);
        }
        match self.decode_compressed(text) {
            Ok(v) => Decoded::Message(v),
            Err(e) => {
                debug!("undecodable frame ({} chars): {e}", text.chars().count());
                Decoded::Undecodable
            }
        }
    }

    fn decode_compressed(&self, text: &str) -> Result<Value, FeedError> {
        let inflated = self.inflater.inflate(&text_to_bytes(text))?;
        let json = String::from_utf8_lossy(&inflated);
        serde_json::from_str(&json).map_err(|e| FeedError::Decode(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        io::Write,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use flate2::{
        Compression,
        write::{GzEncoder, ZlibEncoder},
    };
    use serde_json::json;

    use super::*;

    fn bytes_as_text(bytes: &[u8]) -> String {
        bytes.iter().map(|&b| char::from(b)).collect()
    }

    /// zlib-compress `v` and smuggle the bytes through text, the way the feed does.
    pub(crate) fn compress_as_text(v: &Value) -> String {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(v.to_string().as_bytes()).unwrap();
        bytes_as_text(&enc.finish().unwrap())
    }

    fn gzip_as_text(v: &Value) -> String {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(v.to_string().as_bytes()).unwrap();
        bytes_as_text(&enc.finish().unwrap())
    }

    fn decode(text: &str) -> Decoded {
        FrameDecoder::new().decode(&Frame::Text(text.into()))
    }

    #[test]
    fn plain_json_passes_through() {
        let v = json!({"topic": "trending", "data": [{"baseSymbol": "TEST", "price": 1.23}]});
        assert_eq!(decode(&v.to_string()), Decoded::Message(v));
    }

    #[test]
    fn compressed_frame_round_trips() {
        let v = json!({
            "topic": "trending",
            "data": [{"baseSymbol": "COMPRESSED", "price": 100, "baseName": "Ünïcode 币"}]
        });
        let frame = compress_as_text(&v);
        assert!(serde_json::from_str::<Value>(&frame).is_err());
        assert_eq!(decode(&frame), Decoded::Message(v));
    }

    #[test]
    fn gzip_frame_is_detected() {
        let v = json!({"ping": "1700000000000"});
        assert_eq!(decode(&gzip_as_text(&v)), Decoded::Message(v));
    }

    #[test]
    fn code_points_are_masked_to_a_byte() {
        // U+0178 & 0xFF == 0x78 ('x'), U+0161 & 0xFF == 0x61 ('a')
        assert_eq!(text_to_bytes("\u{178}\u{161}"), vec![0x78, 0x61]);
    }

    #[test]
    fn garbage_and_empty_are_undecodable() {
        for frame in ["", "NOT_JSON_STRING", "{\"topic\":", "\u{78}\u{9c}\u{1}\u{2}"] {
            assert_eq!(decode(frame), Decoded::Undecodable, "frame {frame:?}");
        }
    }

    #[test]
    fn truncated_stream_is_undecodable() {
        let full = compress_as_text(&json!({"topic": "trending", "data": [{"baseSymbol": "X"}]}));
        let cut: String = full.chars().take(full.chars().count() / 2).collect();
        assert_eq!(decode(&cut), Decoded::Undecodable);
    }

    #[test]
    fn compressed_non_json_is_undecodable() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"hello, not json").unwrap();
        let frame = bytes_as_text(&enc.finish().unwrap());
        assert_eq!(decode(&frame), Decoded::Undecodable);
    }

    #[test]
    fn binary_frames_are_undecodable() {
        let dec = FrameDecoder::new();
        assert_eq!(dec.decode(&Frame::Binary(br#"{"topic":"trending"}"#.to_vec())), Decoded::Undecodable);
        assert_eq!(dec.decode(&Frame::Binary(Vec::new())), Decoded::Undecodable);
    }

    struct CountingInflate {
        calls: AtomicUsize,
        output: Vec<u8>,
    }

    impl Inflate for CountingInflate {
        fn inflate(&self, _bytes: &[u8]) -> Result<Vec<u8>, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    #[test]
    fn inflater_only_used_when_plain_parse_fails() {
        let dec = FrameDecoder::with_inflater(CountingInflate {
            calls: AtomicUsize::new(0),
            output: br#"{"topic":"trending","data":[{"baseSymbol":"COMPRESSED"}]}"#.to_vec(),
        });

        assert!(matches!(dec.decode_text(r#"{"topic":"other"}"#), Decoded::Message(_)));
        assert_eq!(dec.inflater.calls.load(Ordering::SeqCst), 0);

        let msg = dec.decode_text("NOT_JSON_STRING").into_message().unwrap();
        assert_eq!(dec.inflater.calls.load(Ordering::SeqCst), 1);
        assert_eq!(msg["data"][0]["baseSymbol"], "COMPRESSED");
    }
}

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::serial::error::SerialPortError;

/// Reads newline delimited text from the wire,
/// and appends a newline to each line it writes.
///
/// A trailing carriage return is stripped from incoming lines.
/// Bad utf8 is replaced rather than rejected.
#[derive(Debug, Clone)]
pub struct LinesCodec {
    /// How far we have looked for a newline into the buffer
    cursor: usize,

    /// Lines longer than this are dropped.
    max_length: usize,

    /// Set while skipping the remains of an overlong line.
    discarding: bool,
}

impl LinesCodec {
    /// Create a new codec which gives up on lines longer than `max_length` bytes.
    pub fn new(max_length: usize) -> Self {
        Self {
            cursor: 0,
            max_length,
            discarding: false,
        }
    }

    fn to_line(bytes: &[u8]) -> String {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);

        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl Default for LinesCodec {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Decoder for LinesCodec {
    type Item = String;
    type Error = SerialPortError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let read_to = src.len();

            let Some(position) = src[self.cursor..read_to].iter().position(|&byte| byte == b'\n') else {
                if read_to > self.max_length {
                    warn!(
                        "Discarding {read_to} bytes without a line ending (max {})",
                        self.max_length
                    );
                    src.clear();
                    self.cursor = 0;
                    self.discarding = true;
                } else {
                    // Next time we are called the same buffer is provided, possibly with more data.
                    // No need to re-read the bytes we have already looked at.
                    self.cursor = read_to;
                }

                return Ok(None);
            };

            // Since we might "start late" in the buffer (from the cursor),
            // the "global" position within the buffer has to be calculated.
            let actual_position = self.cursor + position;

            // Next time we need to start over.
            self.cursor = 0;

            let line = src.split_to(actual_position);

            // Discard the newline by advancing the source buffer beyond it.
            src.advance(1);

            if self.discarding {
                self.discarding = false;
                continue;
            }

            return Ok(Some(Self::to_line(&line)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        self.cursor = 0;

        if src.is_empty() || std::mem::take(&mut self.discarding) {
            src.clear();
            Ok(None)
        } else {
            let rest = src.split_to(src.len());
            Ok(Some(Self::to_line(&rest)))
        }
    }
}

impl Encoder<String> for LinesCodec {
    type Error = SerialPortError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 1);
        dst.extend_from_slice(item.as_bytes());
        dst.extend_from_slice(b"\n");

        Ok(())
    }
}

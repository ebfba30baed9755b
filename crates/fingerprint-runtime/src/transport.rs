//! Line-oriented link to the scanning device.
//!
//! The device speaks newline-terminated text in both directions. Anything
//! that can read and write lines implements [`LineTransport`]; [`SerialLink`]
//! covers serial device nodes as well as in-memory streams in tests.

use std::future::Future;

use fingerprint_core::error::{FingerprintError, Result};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

/// A bidirectional, newline-delimited text channel.
pub trait LineTransport {
    /// Send one command; a trailing newline is appended.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<()>>;

    /// Read the next line without its terminator. `None` at end of stream.
    fn read_line(&mut self) -> impl Future<Output = Result<Option<String>>>;
}

/// [`LineTransport`] over any buffered reader and writer pair.
#[derive(Debug)]
pub struct SerialLink<R, W> {
    reader: R,
    writer: W,
}

/// A [`SerialLink`] on a real serial port.
pub type SerialPortLink = SerialLink<BufReader<ReadHalf<SerialStream>>, WriteHalf<SerialStream>>;

impl<R, W> SerialLink<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl SerialPortLink {
    /// Open `port` at `baud_rate` (8N1, no flow control).
    pub fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let stream = tokio_serial::new(port, baud_rate)
            .open_native_async()
            .map_err(|e| FingerprintError::Serial(format!("cannot open {}: {}", port, e)))?;

        info!("Opened serial port {} at {} baud", port, baud_rate);
        let (reader, writer) = tokio::io::split(stream);
        Ok(Self::new(BufReader::new(reader), writer))
    }
}

impl<R, W> LineTransport for SerialLink<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn send_command(&mut self, command: &str) -> Result<()> {
        debug!("→ {:?}", command);
        let mut bytes = Vec::with_capacity(command.len() + 1);
        bytes.extend_from_slice(command.as_bytes());
        bytes.push(b'\n');
        self.writer
            .write_all(&bytes)
            .await
            .map_err(|e| FingerprintError::Serial(format!("write failed: {}", e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| FingerprintError::Serial(format!("flush failed: {}", e)))
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let n = self
            .reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| FingerprintError::Serial(format!("read failed: {}", e)))?;
        if n == 0 {
            return Ok(None);
        }
        // Serial noise after a reset is not always valid UTF-8.
        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        debug!("← {:?}", line);
        Ok(Some(line))
    }
}

//! Line-oriented stream plumbing shared by the SMTP client and its test
//! servers.

pub mod stream;
pub mod trace;

use stream::{MaybeTls, Tls};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use trace::{Sink, Trace};
use tracing::debug;

pub async fn write<S: AsyncWrite + Unpin>(
    stream: &mut S,
    src: impl AsRef<[u8]>,
) -> std::io::Result<()> {
    let src = src.as_ref();
    debug!("write: {:?}", String::from_utf8_lossy(src));
    stream.write_all(src).await
}

pub async fn write_flush<S: AsyncWrite + Unpin>(
    stream: &mut S,
    src: impl AsRef<[u8]>,
) -> std::io::Result<()> {
    write(stream, src).await?;
    stream.flush().await
}

#[derive(Debug)]
pub enum ReadLineError {
    Io(std::io::Error),
    Eof,
}

impl From<std::io::Error> for ReadLineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ReadLineError> for std::io::Error {
    fn from(e: ReadLineError) -> Self {
        match e {
            ReadLineError::Io(e) => e,
            ReadLineError::Eof => std::io::ErrorKind::UnexpectedEof.into(),
        }
    }
}

/// Read a line into `buf`, without the trailing CRLF.
pub async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> Result<(), ReadLineError> {
    assert!(buf.is_empty(), "buffer must be empty");

    if reader.read_until(b'\n', buf).await? == 0 {
        return Err(ReadLineError::Eof);
    }

    debug!("read: {:?}", String::from_utf8_lossy(buf));

    let rpos = buf
        .iter()
        .rposition(|&c| c != b'\r' && c != b'\n')
        .map_or(0, |pos| pos + 1);
    buf.truncate(rpos);

    Ok(())
}

pub type Stream<T, IO> = BufReader<Trace<MaybeTls<T, IO>>>;

/// A buffered, optionally traced connection that can be upgraded to TLS.
pub struct Connection<T: Tls<IO>, IO: AsyncRead + AsyncWrite + Unpin> {
    stream: Stream<T, IO>,
}

impl<T: Tls<IO>, IO: AsyncRead + AsyncWrite + Unpin> Connection<T, IO> {
    pub fn new(stream: impl Into<MaybeTls<T, IO>>) -> Self {
        Self::traced(stream, None)
    }

    /// Like [`Connection::new`], echoing the conversation to `sink` if given.
    ///
    /// The tracer sits above the TLS layer, so the conversation stays
    /// readable after a `STARTTLS` upgrade.
    pub fn traced(stream: impl Into<MaybeTls<T, IO>>, sink: Option<Sink>) -> Self {
        Self {
            stream: BufReader::new(Trace::with_sink(stream.into(), sink)),
        }
    }

    pub fn stream_mut(&mut self) -> &mut Stream<T, IO> {
        &mut self.stream
    }

    pub async fn write(&mut self, src: impl AsRef<[u8]>) -> std::io::Result<()> {
        write(&mut self.stream, src).await
    }

    pub async fn write_flush(&mut self, src: impl AsRef<[u8]>) -> std::io::Result<()> {
        write_flush(&mut self.stream, src).await
    }

    /// Upgrade the connection to TLS.
    ///
    /// Fails without touching the stream if the peer has already sent data
    /// that would be read as part of the plaintext session.
    pub async fn upgrade(&mut self, tls_config: T::Config<'_>) -> std::io::Result<()> {
        if !self.stream.buffer().is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "unexpected data before TLS handshake",
            ));
        }

        self.stream.get_mut().get_mut().upgrade(tls_config).await
    }

    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }

    pub fn is_plain(&self) -> bool {
        self.stream.get_ref().get_ref().is_plain()
    }

    pub fn is_tls(&self) -> bool {
        self.stream.get_ref().get_ref().is_tls()
    }
}

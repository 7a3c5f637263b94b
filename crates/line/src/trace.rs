//! Conversation tracing.
//!
//! [`Trace`] sits between a connection and its transport and copies every
//! byte that passes through it to a diagnostic sink: bytes received are
//! prefixed with `< `, bytes sent with `> `. Nothing is buffered or altered.

use std::{
    fmt,
    io::Write,
    pin::Pin,
    task::{ready, Context, Poll},
};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Where traced bytes are echoed to.
pub type Sink = Box<dyn Write + Send>;

pub struct Trace<S> {
    inner: S,
    sink: Option<Sink>,
}

impl<S> Trace<S> {
    pub fn with_sink(inner: S, sink: Option<Sink>) -> Self {
        Self { inner, sink }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    fn echo(&mut self, prefix: &str, bytes: &[u8]) {
        if let Some(sink) = &mut self.sink {
            // a broken sink must not break the conversation
            let _ = write!(sink, "{prefix}{}", String::from_utf8_lossy(bytes));
            let _ = sink.flush();
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Trace<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace")
            .field("inner", &self.inner)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Trace<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let filled_before = buf.filled().len();

        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        let received = &buf.filled()[filled_before..];
        if !received.is_empty() {
            this.echo("< ", received);
        }

        Poll::Ready(Ok(()))
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Trace<S> {
    /// Only the bytes the inner stream accepted are echoed, so a partial or
    /// pending write is never traced twice.
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let this = self.get_mut();
        let written = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;

        if written > 0 {
            this.echo("> ", &buf[..written]);
        }

        Poll::Ready(Ok(written))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

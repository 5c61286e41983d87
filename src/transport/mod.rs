//! Byte-stream transport abstraction.
//!
//! The session needs two independent halves: a [`FrameSource`] owned by the
//! receiver task and a [`FrameSink`] owned by the command channel. Any tokio
//! `AsyncRead`/`AsyncWrite` type already qualifies, so a serial port, a TCP
//! bridge or a `tokio::io::duplex` pipe in tests all plug in unchanged.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

pub mod serial;

/// Read side of a transport.
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    /// Read whatever bytes are available into `buf`.
    ///
    /// Returns:
    /// - `Ok(n)` with `n > 0` - bytes were read
    /// - `Ok(0)` - the stream ended (device unplugged, pipe closed)
    /// - `Err(e)` - transient or fatal I/O error
    async fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// Write side of a transport.
#[async_trait::async_trait]
pub trait FrameSink: Send + 'static {
    /// Write one complete frame and flush it.
    async fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()>;
}

#[async_trait::async_trait]
impl<R> FrameSource for R
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.read(buf).await
    }
}

#[async_trait::async_trait]
impl<W> FrameSink for W
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.write_all(frame).await?;
        self.flush().await
    }
}

/// Split a duplex stream into independently owned halves.
pub fn split<T>(io: T) -> (ReadHalf<T>, WriteHalf<T>)
where
    T: AsyncRead + AsyncWrite,
{
    tokio::io::split(io)
}

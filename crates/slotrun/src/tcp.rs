//! TCP transport.
//!
//! Wire format per frame:
//! ```text
//! ┌────────────┬───────────────────────────┐
//! │ Length (4B)│ WireMessage frame (N B)   │
//! │ LE u32     │                           │
//! └────────────┴───────────────────────────┘
//! ```

use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::config::SessionConfig;
use crate::transport;
use crate::transport::Connector;
use crate::transport::Transport;

/// Frame header size (4-byte little-endian length).
const HEADER_SIZE: usize = 4;

/// Writes one length-prefixed frame.
pub(crate) async fn write_frame<W>(writer: &mut W, payload: &[u8], max_len: usize) -> transport::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > max_len {
        return Err(transport::Error::PayloadTooLarge(payload.len()));
    }
    let len = u32::try_from(payload.len()).map_err(|_| transport::Error::PayloadTooLarge(payload.len()))?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame.
///
/// Returns `None` when the peer closed the stream cleanly between frames.
pub(crate) async fn read_frame<R>(reader: &mut R, max_len: usize) -> transport::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(header) as usize;
    if len > max_len {
        return Err(transport::Error::PayloadTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Opens TCP connections to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    endpoint: String,
    connect_timeout: Duration,
    max_frame_len: usize,
}

impl TcpConnector {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            connect_timeout: config.connect_timeout,
            max_frame_len: config.max_frame_len,
        }
    }
}

#[async_trait::async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> transport::Result<Box<dyn Transport>> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.endpoint))
            .await
            .map_err(|_| transport::Error::Timeout)?
            .map_err(|e| transport::Error::Unreachable(format!("{}: {}", self.endpoint, e)))?;
        stream.set_nodelay(true)?;
        Ok(Box::new(TcpTransport { stream: Mutex::new(Some(stream)), max_frame_len: self.max_frame_len }))
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.endpoint)
    }
}

/// One TCP connection. Calls are serialized on the stream.
///
/// Once a call fails after its request started going out, the stream may
/// hold half a frame in either direction; it is closed and every later call
/// fails with `ConnectionLost`.
pub struct TcpTransport {
    stream: Mutex<Option<TcpStream>>,
    max_frame_len: usize,
}

impl TcpTransport {
    async fn exchange(stream: &mut TcpStream, payload: &[u8], max_frame_len: usize) -> transport::Result<Vec<u8>> {
        write_frame(stream, payload, max_frame_len).await?;
        read_frame(stream, max_frame_len)
            .await?
            .ok_or_else(|| transport::Error::ConnectionLost("server closed the connection".into()))
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn call(&self, payload: &[u8]) -> transport::Result<Vec<u8>> {
        if payload.len() > self.max_frame_len {
            return Err(transport::Error::PayloadTooLarge(payload.len()));
        }
        let mut slot = self.stream.lock().await;
        let stream = slot
            .as_mut()
            .ok_or_else(|| transport::Error::ConnectionLost("connection closed after an earlier failure".into()))?;
        match Self::exchange(stream, payload, self.max_frame_len).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                *slot = None;
                Err(match e {
                    transport::Error::ConnectionLost(_) => e,
                    other => transport::Error::ConnectionLost(other.to_string()),
                })
            }
        }
    }
}

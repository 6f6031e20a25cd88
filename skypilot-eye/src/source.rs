//! Frame sources

use crate::error::VisionError;
use async_trait::async_trait;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Anything that yields fixed-size raw frames
#[async_trait]
pub trait FrameSource: Send {
    /// Fill `buf` with exactly one raw frame.
    async fn read_frame(&mut self, buf: &mut [u8]) -> Result<(), VisionError>;
}

/// Reads back-to-back raw frames from a byte stream, such as the
/// transcoder's stdout
pub struct RawStreamSource<R> {
    reader: R,
}

impl<R> RawStreamSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R> FrameSource for RawStreamSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_frame(&mut self, buf: &mut [u8]) -> Result<(), VisionError> {
        match self.reader.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                Err(VisionError::ShortRead { expected: buf.len() })
            }
            Err(e) => Err(VisionError::Io(e)),
        }
    }
}

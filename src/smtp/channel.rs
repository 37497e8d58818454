use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};

use super::response::Response;

/// Line oriented reader/writer over a byte stream.
pub struct LineChannel<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    buf: Vec<u8>,
}

impl<S> LineChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(reader),
            writer,
            buf: Vec::with_capacity(1024),
        }
    }

    /// Read the next line without its terminator. Accepts both CRLF and bare
    /// LF. Returns `None` once the peer has closed its side.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    pub async fn send(&mut self, response: &Response) -> std::io::Result<()> {
        tracing::trace!("Sending {}", response);
        self.writer.write_all(response.to_line().as_bytes()).await?;
        self.writer.flush().await
    }

    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.writer.shutdown().await
    }
}

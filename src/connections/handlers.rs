use crate::errors_internal::Error;
use crate::utils_internal::RX_LABEL;
use log::{debug, error, trace, warn};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connections::stream_buffer::StreamBuffer;

use super::wrappers::encoded_data::{EncodedTxPayload, IncomingStreamData};

/// Size of the scratch buffer used for a single read from the serial stream.
const READ_CHUNK_SIZE: usize = 1024;

pub fn spawn_read_handler<R, O>(
    cancellation_token: CancellationToken,
    read_stream: R,
    rx_output: O,
) -> JoinHandle<Result<(), Error>>
where
    R: AsyncReadExt + Send + Unpin + 'static,
    O: AsyncWrite + Send + Unpin + 'static,
{
    let handle = start_read_handler(read_stream, rx_output);
    let failure_token = cancellation_token.clone();

    spawn(async move {
        // Check for cancellation signal or handle termination
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                debug!("Read handler cancelled");
                Ok(())
            }
            e = handle => {
                error!("Read handler unexpectedly terminated: {:?}", e);
                // Wake the transmit loop
                failure_token.cancel();
                e
            }
        }
    })
}

async fn start_read_handler<R, O>(read_stream: R, rx_output: O) -> Result<(), Error>
where
    R: AsyncReadExt + Send + Unpin + 'static,
    O: AsyncWrite + Send + Unpin + 'static,
{
    debug!("Started read handler");

    let mut read_stream = read_stream;
    let mut rx_output = rx_output;
    let mut decoder = StreamBuffer::new();

    loop {
        let mut buffer = [0u8; READ_CHUNK_SIZE];
        match read_stream.read(&mut buffer).await {
            Ok(0) => {
                warn!(
                    "read_stream has reached EOF with {} undecoded bytes",
                    decoder.pending_len()
                );
                return Err(Error::StreamClosed);
            }
            Ok(n) => {
                trace!("Read {} bytes from stream", n);
                let data: IncomingStreamData = buffer[..n].into();
                trace!("Read data: {}", data);

                if let Some(text) = decoder.process_incoming_bytes(data)? {
                    write_received_text(&mut rx_output, &text).await?;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                trace!("Read timed out, polling again");
                continue;
            }
            Err(e) => {
                error!("Error reading from stream: {:?}", e);
                return Err(Error::StreamReadError {
                    source: Box::new(e),
                });
            }
        }
    }
}

async fn write_received_text<O>(rx_output: &mut O, text: &str) -> Result<(), Error>
where
    O: AsyncWrite + Unpin,
{
    let line = format!("{RX_LABEL}{text}\n\n");
    rx_output.write_all(line.as_bytes()).await?;
    rx_output.flush().await?;

    Ok(())
}

/// Writes one payload to the transmit half of the stream and flushes it.
pub async fn write_payload<W>(write_stream: &mut W, payload: &EncodedTxPayload) -> Result<(), Error>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    trace!("Writing payload data: {}", payload);

    if let Err(e) = write_stream.write_all(payload.data()).await {
        error!("Error writing to stream: {:?}", e);
        return Err(Error::StreamWriteError {
            source: Box::new(e),
        });
    }

    if let Err(e) = write_stream.flush().await {
        error!("Error flushing stream: {:?}", e);
        return Err(Error::StreamWriteError {
            source: Box::new(e),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn prints_received_text_with_label() {
        let (local, mut remote) = duplex(1024);
        let (console, mut console_reader) = duplex(1024);
        let token = CancellationToken::new();

        let handle = spawn_read_handler(token.clone(), local, console);

        remote.write_all(b"hello\0").await.unwrap();

        let expected = b"Received string: hello\0\n\n";
        let mut printed = vec![0u8; expected.len()];
        console_reader.read_exact(&mut printed).await.unwrap();
        assert_eq!(printed, expected);

        token.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn cancellation_stops_idle_handler() {
        let (local, _remote) = duplex(1024);
        let token = CancellationToken::new();

        let handle = spawn_read_handler(token.clone(), local, tokio::io::sink());
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("read handler did not stop");
        assert!(result.unwrap().is_ok());
    }

    #[tokio::test]
    async fn undecodable_bytes_fail_and_cancel() {
        let (local, mut remote) = duplex(1024);
        let token = CancellationToken::new();

        let handle = spawn_read_handler(token.clone(), local, tokio::io::sink());
        remote.write_all(&[0xff, 0xfe]).await.unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(Error::DecodeError { .. })));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn eof_fails_and_cancels() {
        let (local, remote) = duplex(1024);
        let token = CancellationToken::new();

        let handle = spawn_read_handler(token.clone(), local, tokio::io::sink());
        drop(remote);

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(Error::StreamClosed)));
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn writes_payload_bytes_verbatim() {
        let mut sink: Vec<u8> = Vec::new();
        let payload = EncodedTxPayload::from_text("onsemi UART");

        write_payload(&mut sink, &payload).await.unwrap();

        assert_eq!(sink, b"onsemi UART\0");
    }

    #[tokio::test]
    async fn rejected_write_is_stream_write_error() {
        let (mut local, remote) = duplex(1024);
        drop(remote);
        let payload = EncodedTxPayload::from_text("hello");

        let result = write_payload(&mut local, &payload).await;

        assert!(matches!(result, Err(Error::StreamWriteError { .. })));
    }
}

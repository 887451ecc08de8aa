use log::{debug, warn};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, Lines};
use tokio_serial::SerialStream;

use crate::connections::wrappers::{PortDescriptor, SessionConfig};
use crate::errors_internal::Error;
use crate::utils_internal::{build_serial_stream, parse_baud_rate, resolve_selection};

/// The prompt asking for a port selection.
pub const PORT_PROMPT: &str = "Enter list index or COM port name (\"COMx\"): ";

/// The prompt asking for a baud rate.
pub const BAUD_RATE_PROMPT: &str = "Enter the baudrate to use: ";

/// Printed once the port is open, before the transmit loop starts.
pub const USAGE_BANNER: &str = "\nType in a 21 character string (C application expects 21 character strings\n\
at a time) or simply press Enter to send 'onsemi UART'.\n\
Enter 'q' at any point to exit.\n\n";

/// Printed when the selected port cannot be opened.
pub const ACCESS_DENIED_MESSAGE: &str = "\nAccess denied. Ensure that the serial port is not open elsewhere and then try again.\nExiting.\n";

async fn write_flushed<W>(out: &mut W, text: &str) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(text.as_bytes()).await?;
    out.flush().await?;

    Ok(())
}

async fn prompt<R, W>(lines: &mut Lines<R>, out: &mut W, text: &str) -> Result<String, Error>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_flushed(out, text).await?;

    lines.next_line().await?.ok_or(Error::InputClosed)
}

/// Prints the number of detected ports followed by one `#<index> <device>` entry per port.
pub async fn print_port_list<W>(out: &mut W, ports: &[PortDescriptor]) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    let mut listing = format!("\n{} COM port(s) found:\n\n", ports.len());
    for port in ports {
        listing.push_str(&format!("{port}\n\n"));
    }

    write_flushed(out, &listing).await
}

/// Asks for a port until the answer resolves to a device name.
///
/// Invalid answers are reported and the prompt is repeated.
///
/// # Errors
///
/// Fails with `Error::InputClosed` if input ends before a valid answer is given.
pub async fn prompt_port_selection<R, W>(
    lines: &mut Lines<R>,
    out: &mut W,
    ports: &[PortDescriptor],
) -> Result<String, Error>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let input = prompt(lines, out, PORT_PROMPT).await?;

        match resolve_selection(&input, ports) {
            Ok(port_name) => return Ok(port_name),
            Err(e) if e.is_usage_error() => {
                warn!("Rejected port selection: {}", e);
                write_flushed(out, &format!("{e}\n")).await?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Asks for a baud rate until the answer is a positive integer.
///
/// # Errors
///
/// Fails with `Error::InputClosed` if input ends before a valid answer is given.
pub async fn prompt_baud_rate<R, W>(lines: &mut Lines<R>, out: &mut W) -> Result<u32, Error>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let input = prompt(lines, out, BAUD_RATE_PROMPT).await?;

        match parse_baud_rate(&input) {
            Ok(baud_rate) => return Ok(baud_rate),
            Err(e) => {
                warn!("Rejected baud rate: {}", e);
                write_flushed(out, &format!("{e}\n")).await?;
            }
        }
    }
}

/// Prints the usage banner shown before the transmit loop.
pub async fn print_usage_banner<W>(out: &mut W) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    write_flushed(out, USAGE_BANNER).await
}

/// Prints the message shown when the selected port cannot be opened.
pub async fn print_access_denied<W>(out: &mut W) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
{
    write_flushed(out, ACCESS_DENIED_MESSAGE).await
}

/// Opens the configured port, or prints the access-denied message if it cannot be opened.
///
/// Returns `Ok(None)` after printing the message. No session should be started in that case.
///
/// # Errors
///
/// Fails only if the message cannot be written to `out`.
pub async fn open_or_deny<W>(
    config: &SessionConfig,
    out: &mut W,
) -> Result<Option<SerialStream>, Error>
where
    W: AsyncWrite + Unpin,
{
    match build_serial_stream(config) {
        Ok(serial_stream) => Ok(Some(serial_stream)),
        Err(e @ Error::PortOpenFailure { .. }) => {
            debug!("{}", e);
            print_access_denied(out).await?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

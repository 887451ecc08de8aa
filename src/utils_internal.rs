use crate::errors_internal::Error;
use std::time::Duration;

use log::debug;
use tokio_serial::{available_ports, SerialStream};

use crate::connections::wrappers::encoded_data::EncodedTxPayload;
use crate::connections::wrappers::{PortDescriptor, SessionConfig};
use crate::connections::TxCommand;

// Constants declarations

/// The timeout bounding a single read on the serial port. A read that times out is retried.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// The string sent in place of an empty input line. Matches the string the target
/// application echoes on startup.
pub const DEFAULT_TX_STRING: &str = "onsemi UART";

/// The input line that ends the terminal session.
pub const QUIT_SENTINEL: &str = "q";

/// The label printed before every chunk of text received from the port.
pub const RX_LABEL: &str = "Received string: ";

/// Inputs longer than this many characters are treated as literal port names
/// rather than list indices.
pub const MAX_INDEX_INPUT_LEN: usize = 2;

/// The environment variable read by the binary to pick its log level.
pub const LOG_LEVEL_ENV: &str = "UART_TERMINAL_LOG";

/// A helper method that uses the `tokio_serial` crate to list all available serial
/// ports on the system, in the order the platform reports them.
///
/// # Arguments
///
/// None
///
/// # Returns
///
/// A result that resolves to a vector of `PortDescriptor`s. The vector is empty if
/// no ports were found.
///
/// # Examples
///
/// ```
/// let ports = utils::stream::available_serial_ports()?;
/// for port in &ports {
///     println!("{}", port);
/// }
/// ```
///
/// # Errors
///
/// Fails with `Error::PortEnumerationFailure` if the platform query fails.
///
/// # Panics
///
/// None
///
pub fn available_serial_ports() -> Result<Vec<PortDescriptor>, Error> {
    let ports = available_ports()
        .map_err(|source| Error::PortEnumerationFailure { source })?
        .into_iter()
        .enumerate()
        .map(|(index, port)| PortDescriptor::new(index, port.port_name))
        .collect();

    Ok(ports)
}

/// A helper method that uses the `tokio_serial` crate to open the serial port
/// described by a `SessionConfig`. The returned stream implements
/// `AsyncReadExt + AsyncWriteExt` and is passed into `SerialSession::connect`.
///
/// # Arguments
///
/// * `config` - The port name, baud rate and read timeout.
///
/// # Returns
///
/// Returns a result that resolves to an open `tokio_serial::SerialStream`.
///
/// # Examples
///
/// ```
/// let config = SessionConfig::new("/dev/ttyUSB0", 115_200)?;
/// let serial_stream = utils::stream::build_serial_stream(&config)?;
/// let session = SerialSession::new().connect(serial_stream, tokio::io::stdout());
/// ```
///
/// # Errors
///
/// Fails with `Error::PortOpenFailure` if the port cannot be opened, usually because
/// it is held by another process or does not exist.
///
/// # Panics
///
/// None
///
pub fn build_serial_stream(config: &SessionConfig) -> Result<SerialStream, Error> {
    let builder = tokio_serial::new(config.port_name(), config.baud_rate())
        .timeout(config.read_timeout());

    let serial_stream =
        SerialStream::open(&builder).map_err(|source| Error::PortOpenFailure {
            port_name: config.port_name().to_string(),
            source,
        })?;

    debug!(
        "Opened serial port \"{}\" at {} baud",
        config.port_name(),
        config.baud_rate()
    );

    Ok(serial_stream)
}

/// A helper function that turns the user's port selection into a device name.
///
/// Inputs longer than two characters are returned unchanged, as a literal device
/// name. Shorter inputs are parsed as an index into `ports`, where `-1` selects the
/// last port, `-2` the one before it, and so on.
///
/// # Arguments
///
/// * `input` - The raw text entered by the user.
/// * `ports` - The list of ports the index refers to.
///
/// # Returns
///
/// The device name of the selected port.
///
/// # Examples
///
/// ```
/// let ports = vec![PortDescriptor::new(0, "COM3")];
/// assert_eq!(utils::resolve_selection("0", &ports)?, "COM3");
/// assert_eq!(utils::resolve_selection("COM7", &ports)?, "COM7");
/// ```
///
/// # Errors
///
/// Returns `Error::SelectionNotAnInteger` if a short input does not parse as an integer,
/// and `Error::SelectionOutOfRange` if the index does not refer to a listed port.
///
/// # Panics
///
/// None
///
pub fn resolve_selection(input: &str, ports: &[PortDescriptor]) -> Result<String, Error> {
    if input.chars().count() > MAX_INDEX_INPUT_LEN {
        return Ok(input.to_string());
    }

    let index: i64 = input
        .trim()
        .parse()
        .map_err(|_| Error::SelectionNotAnInteger {
            input: input.to_string(),
        })?;

    // Negative indices count back from the end of the list
    let position = if index < 0 {
        index + ports.len() as i64
    } else {
        index
    };

    let port = usize::try_from(position)
        .ok()
        .and_then(|i| ports.get(i))
        .ok_or(Error::SelectionOutOfRange {
            index,
            port_count: ports.len(),
        })?;

    Ok(port.device().to_string())
}

/// A helper function that parses a baud rate entered by the user.
///
/// # Errors
///
/// Returns `Error::InvalidBaudRate` unless `input` is a positive integer that fits in a `u32`.
pub fn parse_baud_rate(input: &str) -> Result<u32, Error> {
    match input.trim().parse::<u32>() {
        Ok(baud_rate) if baud_rate > 0 => Ok(baud_rate),
        _ => Err(Error::InvalidBaudRate {
            input: input.to_string(),
        }),
    }
}

/// A helper function that encodes a line of text for the wire by appending the
/// null terminator expected by the target application.
///
/// The header-free format is shown below:
///
/// ```text
/// | UTF-8 text (N bytes) | 0x00 (1 byte) |
/// ```
pub fn format_tx_payload(text: &str) -> EncodedTxPayload {
    EncodedTxPayload::from_text(text)
}

/// A helper function that decides what an input line asks the terminal to do.
///
/// The quit sentinel ends the session, an empty line sends `DEFAULT_TX_STRING`,
/// and anything else is sent verbatim.
pub fn classify_line(line: &str) -> TxCommand {
    if line == QUIT_SENTINEL {
        return TxCommand::Quit;
    }

    let text = if line.is_empty() {
        DEFAULT_TX_STRING
    } else {
        line
    };

    TxCommand::Send(format_tx_payload(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_ports() -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::new(0, "/dev/ttyUSB0"),
            PortDescriptor::new(1, "/dev/ttyACM0"),
        ]
    }

    #[test]
    fn opening_missing_port_is_open_failure() {
        let config = SessionConfig::new("/dev/uart-terminal-no-such-port", 115_200).unwrap();

        let result = build_serial_stream(&config);

        assert!(matches!(
            result,
            Err(Error::PortOpenFailure { ref port_name, .. })
                if port_name == "/dev/uart-terminal-no-such-port"
        ));
    }

    #[test]
    fn long_selection_is_literal_port_name() {
        let ports = mock_ports();

        for input in ["COM3", "/dev/ttyS4", "abc", "100"] {
            assert_eq!(resolve_selection(input, &ports).unwrap(), input);
        }
    }

    #[test]
    fn long_selection_is_literal_even_without_ports() {
        assert_eq!(resolve_selection("COM12", &[]).unwrap(), "COM12");
    }

    #[test]
    fn short_selection_indexes_port_list() {
        let ports = mock_ports();

        assert_eq!(resolve_selection("0", &ports).unwrap(), "/dev/ttyUSB0");
        assert_eq!(resolve_selection("1", &ports).unwrap(), "/dev/ttyACM0");
        assert_eq!(resolve_selection("01", &ports).unwrap(), "/dev/ttyACM0");
    }

    #[test]
    fn out_of_range_selection_fails() {
        let ports = mock_ports();

        let result = resolve_selection("2", &ports);

        assert!(matches!(
            result,
            Err(Error::SelectionOutOfRange {
                index: 2,
                port_count: 2
            })
        ));
    }

    #[test]
    fn negative_selection_counts_from_end() {
        let ports = mock_ports();

        assert_eq!(resolve_selection("-1", &ports).unwrap(), "/dev/ttyACM0");
        assert_eq!(resolve_selection("-2", &ports).unwrap(), "/dev/ttyUSB0");
    }

    #[test]
    fn negative_selection_past_start_is_out_of_range() {
        let ports = mock_ports();

        let result = resolve_selection("-3", &ports);

        assert!(matches!(
            result,
            Err(Error::SelectionOutOfRange {
                index: -3,
                port_count: 2
            })
        ));
    }

    #[test]
    fn negative_selection_fails_without_ports() {
        assert!(matches!(
            resolve_selection("-1", &[]),
            Err(Error::SelectionOutOfRange { index: -1, .. })
        ));
    }

    #[test]
    fn any_index_fails_without_ports() {
        let result = resolve_selection("0", &[]);

        assert!(matches!(
            result,
            Err(Error::SelectionOutOfRange { port_count: 0, .. })
        ));
    }

    #[test]
    fn short_non_integer_selection_fails() {
        let ports = mock_ports();

        for input in ["", "x", "1a"] {
            assert!(matches!(
                resolve_selection(input, &ports),
                Err(Error::SelectionNotAnInteger { .. })
            ));
        }
    }

    #[test]
    fn baud_rate_parses_positive_integers() {
        assert_eq!(parse_baud_rate("9600").unwrap(), 9600);
        assert_eq!(parse_baud_rate(" 115200 ").unwrap(), 115_200);
    }

    #[test]
    fn baud_rate_rejects_invalid_input() {
        for input in ["", "0", "-9600", "fast", "96.5", "99999999999"] {
            assert!(matches!(
                parse_baud_rate(input),
                Err(Error::InvalidBaudRate { .. })
            ));
        }
    }

    #[test]
    fn line_is_sent_with_terminator() {
        match classify_line("hello") {
            TxCommand::Send(payload) => assert_eq!(payload.data(), b"hello\0"),
            TxCommand::Quit => panic!("expected a payload"),
        }
    }

    #[test]
    fn empty_line_sends_default_string() {
        match classify_line("") {
            TxCommand::Send(payload) => assert_eq!(payload.data(), b"onsemi UART\0"),
            TxCommand::Quit => panic!("expected a payload"),
        }
    }

    #[test]
    fn sentinel_quits() {
        assert_eq!(classify_line("q"), TxCommand::Quit);
    }

    #[test]
    fn sentinel_must_match_exactly() {
        for line in ["Q", "q ", "quit"] {
            assert_ne!(classify_line(line), TxCommand::Quit);
        }
    }
}

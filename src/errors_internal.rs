use thiserror::Error;

/// This enum defines the possible errors that can occur within the public API of the library.
#[derive(Error, Debug)]
pub enum Error {
    /// An error indicating that the host's serial ports could not be enumerated.
    #[error("Failed to list available serial ports with error {source}")]
    PortEnumerationFailure { source: tokio_serial::Error },

    /// An error indicating that the selected serial port could not be opened or configured.
    /// This is usually because the port is already held by another process.
    #[error("Failed to open serial port \"{port_name}\" with error {source}")]
    PortOpenFailure {
        port_name: String,
        source: tokio_serial::Error,
    },

    /// An error indicating that a numeric port selection does not index into the port list.
    #[error("Port index {index} is out of range, {port_count} port(s) available")]
    SelectionOutOfRange { index: i64, port_count: usize },

    /// An error indicating that a short port selection could not be parsed as a list index.
    #[error("\"{input}\" is neither a list index nor a port name")]
    SelectionNotAnInteger { input: String },

    /// An error indicating that the entered baud rate is not a positive integer.
    #[error("\"{input}\" is not a valid baud rate, expected a positive integer")]
    InvalidBaudRate { input: String },

    /// An error indicating that user input ended while a value was still being prompted for.
    #[error("Input closed before a value was entered")]
    InputClosed,

    /// An error indicating that bytes received from the port are not valid UTF-8 text.
    #[error("Received bytes are not valid text: {source}")]
    DecodeError {
        #[from]
        source: std::str::Utf8Error,
    },

    /// An error indicating that the library failed to read from the serial stream half implementing `AsyncReadExt`.
    #[error("Failed to read from stream with error {source:?}")]
    StreamReadError {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// An error indicating that the library failed to write to the serial stream half implementing `AsyncWriteExt`.
    #[error("Failed to write to stream with error {source:?}")]
    StreamWriteError {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// An error indicating that the serial stream reported end-of-file.
    #[error("Serial stream reached EOF")]
    StreamClosed,

    /// An error indicating that reading user input or writing to the console failed.
    #[error("Console I/O failed with error {source}")]
    ConsoleError {
        #[from]
        source: std::io::Error,
    },

    /// An error indicating that the library failed to join the spawned receive task.
    #[error(transparent)]
    JoinError(#[from] tokio::task::JoinError),
}

impl Error {
    /// Returns `true` for usage errors that the user can correct by entering a different value.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::SelectionOutOfRange { .. }
                | Error::SelectionNotAnInteger { .. }
                | Error::InvalidBaudRate { .. }
        )
    }
}

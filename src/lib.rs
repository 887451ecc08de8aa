//! An interactive terminal for exercising a UART peripheral over a serial port.

pub(crate) mod connections;
pub(crate) mod console_internal;
pub(crate) mod errors_internal;
pub(crate) mod utils_internal;

/// This module contains the main API for running a terminal session over a serial port.
/// This module exposes the `SerialSession` struct, as well as helper states within the
/// `state` module.
///
/// The user will create a new instance of the API through calling the `SerialSession::new()`
/// method. The only method that is exposed on the resulting disconnected session is `connect`,
/// which takes an open stream and the output that received text should be printed to.
/// `connect` spawns the receive task, which prints all incoming text until the session ends.
///
/// The connected session can then write payloads with `send_payload`, or hand control to
/// `run_tx_loop`, which reads lines of user input and writes each one, null terminated, to
/// the port. The loop reports why it ended through `TxLoopExit`.
///
/// To close the port, the user calls `disconnect`. This stops and joins the receive task
/// before the port is released.
pub mod api {
    pub use crate::connections::stream_api::state;
    pub use crate::connections::stream_api::SerialSession;
    pub use crate::connections::TxCommand;
    pub use crate::connections::TxLoopExit;
}

/// This module contains the global `Error` type of the library. This enum implements
/// `std::error::Error`, `std::fmt::Display`, and `std::fmt::Debug`. This enum is used to
/// represent all errors that can occur within the library.
pub mod errors {
    pub use crate::errors_internal::Error;
}

/// This module contains the interactive prompts and fixed messages of the terminal.
/// All functions are generic over their input and output, so they can be driven by
/// stdin/stdout or by in-memory buffers.
pub mod console {
    pub use crate::console_internal::ACCESS_DENIED_MESSAGE;
    pub use crate::console_internal::BAUD_RATE_PROMPT;
    pub use crate::console_internal::PORT_PROMPT;
    pub use crate::console_internal::USAGE_BANNER;

    pub use crate::console_internal::open_or_deny;
    pub use crate::console_internal::print_access_denied;
    pub use crate::console_internal::print_port_list;
    pub use crate::console_internal::print_usage_banner;
    pub use crate::console_internal::prompt_baud_rate;
    pub use crate::console_internal::prompt_port_selection;
}

/// This module exposes utility functions and the constants that configure the terminal.
///
/// `DEFAULT_READ_TIMEOUT` bounds a single read on the port. `DEFAULT_TX_STRING` is sent
/// when the user enters an empty line, and `QUIT_SENTINEL` ends the session. `RX_LABEL`
/// prefixes every chunk of received text. `LOG_LEVEL_ENV` names the environment variable
/// the binary reads its log level from.
///
/// The `stream` module contains helper methods that are used to find and open serial ports.
pub mod utils {
    pub use crate::utils_internal::DEFAULT_READ_TIMEOUT;
    pub use crate::utils_internal::DEFAULT_TX_STRING;
    pub use crate::utils_internal::LOG_LEVEL_ENV;
    pub use crate::utils_internal::MAX_INDEX_INPUT_LEN;
    pub use crate::utils_internal::QUIT_SENTINEL;
    pub use crate::utils_internal::RX_LABEL;

    pub use crate::utils_internal::classify_line;
    pub use crate::utils_internal::format_tx_payload;
    pub use crate::utils_internal::parse_baud_rate;
    pub use crate::utils_internal::resolve_selection;

    /// This module contains utility functions that are used to build the stream that a
    /// `SerialSession` runs over. Since `SerialSession::connect` only requires that the stream
    /// implements `AsyncRead + AsyncWrite`, any such stream can be used in place of a port.
    ///
    /// `available_serial_ports` lists the ports on the host machine, and `build_serial_stream`
    /// opens one of them from a `SessionConfig`.
    pub mod stream {
        pub use crate::utils_internal::available_serial_ports;
        pub use crate::utils_internal::build_serial_stream;
    }
}

/// This module exposes wrappers around the values that flow through the terminal.
///
/// The `PortDescriptor` struct pairs a port's device name with its position in the
/// enumerated list.
///
/// The `SessionConfig` struct holds the port name, baud rate and read timeout used to
/// open a session. Its constructor rejects a zero baud rate.
///
/// The `EncodedTxPayload` struct is a wrapper around the exact bytes written for one
/// line of input, including the trailing null terminator.
///
/// The `IncomingStreamData` struct is a wrapper around one chunk of bytes read from the port.
pub mod types {
    pub use crate::connections::wrappers::PortDescriptor;
    pub use crate::connections::wrappers::SessionConfig;

    pub use crate::connections::wrappers::encoded_data::EncodedTxPayload;
    pub use crate::connections::wrappers::encoded_data::IncomingStreamData;
}

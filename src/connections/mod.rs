use wrappers::encoded_data::EncodedTxPayload;

pub(crate) mod handlers;
pub mod stream_api;
pub(crate) mod stream_buffer;
pub mod wrappers;

/// What a single line of user input asks the terminal to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxCommand {
    /// End the session without writing anything.
    Quit,
    /// Write the payload to the serial port.
    Send(EncodedTxPayload),
}

/// Why the transmit loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxLoopExit {
    /// The user entered the quit sentinel.
    Quit,
    /// User input reached end-of-file.
    InputClosed,
    /// The receive task stopped, so the session cannot continue.
    ReceiverStopped,
}

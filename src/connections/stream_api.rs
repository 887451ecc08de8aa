use crate::errors_internal::Error;
use crate::utils_internal::classify_line;
use log::{debug, info, trace};
use std::marker::PhantomData;
use tokio::{
    io::{AsyncBufRead, AsyncRead, AsyncWrite, Lines},
    task::JoinHandle,
};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::{handlers, wrappers::encoded_data::EncodedTxPayload, TxCommand, TxLoopExit};

type BoxedWriteStream = Box<dyn AsyncWrite + Send + Unpin>;

// These structs are needed to guarantee that the `SerialSession` struct connection
// methods are called in the correct order. This is done by using the typestate
// pattern, which is a way of using the type system to enforce state transitions.
// Reference: https://github.com/letsgetrusty/generics_and_zero_sized_types/blob/master/src/main.rs
pub mod state {

    /// No stream is attached.
    #[derive(Debug, Default)]
    pub struct Disconnected;

    /// A stream is attached and the receive task is running.
    #[derive(Debug, Default)]
    pub struct Connected;
}

// SerialSession definition

/// A struct that owns one open serial port for the lifetime of a terminal session.
///
/// This struct can either be in the `Disconnected` or `Connected` state. The
/// `Disconnected` state is the default state, and only exposes `connect`. Connecting
/// splits the stream: the read half is handed to a spawned receive task, and the
/// write half stays with the session for the transmit loop.
///
/// The port is closed by `disconnect`, which stops and joins the receive task before
/// dropping the write half. A connected session that is dropped without calling
/// `disconnect` still signals the receive task to stop.
pub struct SerialSession<State = state::Connected> {
    write_stream: Option<BoxedWriteStream>,

    read_handle: Option<JoinHandle<Result<(), Error>>>,

    cancellation_token: Option<CancellationToken>,
    cancellation_guard: Option<DropGuard>,

    typestate: PhantomData<State>,
}

impl<State> Default for SerialSession<State> {
    fn default() -> Self {
        SerialSession {
            write_stream: None,
            read_handle: None,
            cancellation_token: None,
            cancellation_guard: None,
            typestate: PhantomData,
        }
    }
}

impl<State> std::fmt::Debug for SerialSession<State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("write_stream_open", &self.write_stream.is_some())
            .field("read_handle", &self.read_handle)
            .field("cancellation_token", &self.cancellation_token)
            .finish()
    }
}

// Public connection management API

impl SerialSession<state::Disconnected> {
    /// A method to create an unconnected instance of the `SerialSession` struct.
    ///
    /// # Arguments
    ///
    /// None
    ///
    /// # Returns
    ///
    /// Returns an instance of the `SerialSession` struct with no open stream.
    ///
    /// # Examples
    ///
    /// ```
    /// let session = SerialSession::new();
    /// ```
    ///
    /// # Errors
    ///
    /// None
    ///
    /// # Panics
    ///
    /// None
    ///
    pub fn new() -> SerialSession<state::Disconnected> {
        Self::default()
    }

    /// A method to start a session over a provided stream. This method is generic,
    /// and requires the `stream` parameter to implement `AsyncRead + AsyncWrite`.
    ///
    /// This method spawns the receive task, which prints all text read from the stream
    /// to `rx_output`, and initializes the cancellation token used to stop it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `stream` - A generic stream, usually a `tokio_serial::SerialStream`.
    /// * `rx_output` - Where received text is printed, usually `tokio::io::stdout()`.
    ///
    /// # Returns
    ///
    /// Returns the connected session.
    ///
    /// # Examples
    ///
    /// ```
    /// let serial_stream = utils::stream::build_serial_stream(&config)?;
    /// let session = SerialSession::new().connect(serial_stream, tokio::io::stdout());
    /// ```
    ///
    /// # Errors
    ///
    /// None
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    ///
    pub fn connect<S, O>(mut self, stream: S, rx_output: O) -> SerialSession<state::Connected>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        O: AsyncWrite + Send + Unpin + 'static,
    {
        // Spawn receive task with kill switch

        let (read_stream, write_stream) = tokio::io::split(stream);
        let cancellation_token = CancellationToken::new();

        self.read_handle = Some(handlers::spawn_read_handler(
            cancellation_token.clone(),
            read_stream,
            rx_output,
        ));

        debug!("Serial session connected");

        SerialSession::<state::Connected> {
            write_stream: Some(Box::new(write_stream)),
            read_handle: self.read_handle.take(),
            cancellation_guard: Some(cancellation_token.clone().drop_guard()),
            cancellation_token: Some(cancellation_token),
            typestate: PhantomData,
        }
    }
}

impl SerialSession<state::Connected> {
    /// Writes one encoded payload to the port.
    ///
    /// # Errors
    ///
    /// Fails with `Error::StreamWriteError` if the write or the flush fails.
    pub async fn send_payload(&mut self, payload: &EncodedTxPayload) -> Result<(), Error> {
        let write_stream = self.write_stream.as_mut().ok_or(Error::StreamClosed)?;

        handlers::write_payload(write_stream, payload).await
    }

    /// Returns a clone of the token that is cancelled when the session stops,
    /// either through `disconnect` or because the receive task failed.
    pub fn stop_signal(&self) -> CancellationToken {
        self.cancellation_token.clone().unwrap_or_default()
    }

    /// Runs the transmit loop: reads lines from `lines` and writes each one to the
    /// port until the quit sentinel is entered.
    ///
    /// An empty line sends the default string. Every payload is terminated with a
    /// single null byte.
    ///
    /// # Arguments
    ///
    /// * `lines` - The source of user input, usually stdin.
    ///
    /// # Returns
    ///
    /// Returns why the loop stopped: the sentinel, end of input, or a stopped receive task.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    /// let exit = session.run_tx_loop(&mut lines).await?;
    /// session.disconnect().await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Fails if reading input fails, or if a payload cannot be written to the port.
    ///
    /// # Panics
    ///
    /// None
    ///
    pub async fn run_tx_loop<R>(&mut self, lines: &mut Lines<R>) -> Result<TxLoopExit, Error>
    where
        R: AsyncBufRead + Unpin,
    {
        let stop_signal = self.stop_signal();

        loop {
            let line = tokio::select! {
                biased;
                _ = stop_signal.cancelled() => {
                    debug!("Receive task stopped, leaving transmit loop");
                    return Ok(TxLoopExit::ReceiverStopped);
                }
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                info!("Input closed, leaving transmit loop");
                return Ok(TxLoopExit::InputClosed);
            };

            match classify_line(&line) {
                TxCommand::Quit => {
                    debug!("Quit sentinel entered");
                    return Ok(TxLoopExit::Quit);
                }
                TxCommand::Send(payload) => self.send_payload(&payload).await?,
            }
        }
    }

    /// A method to end the session. This method signals the receive task to stop,
    /// waits for it to finish, and only then closes the port.
    ///
    /// # Arguments
    ///
    /// None
    ///
    /// # Returns
    ///
    /// Returns the disconnected session, or the error that stopped the receive task.
    /// The port is closed in both cases.
    ///
    /// # Examples
    ///
    /// ```
    /// let session = SerialSession::new().connect(serial_stream, tokio::io::stdout());
    ///
    /// // Write payloads with `send_payload` or `run_tx_loop`
    ///
    /// session.disconnect().await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Fails if the receive task failed, or if it could not be joined.
    ///
    /// # Panics
    ///
    /// None
    ///
    pub async fn disconnect(mut self) -> Result<SerialSession<state::Disconnected>, Error> {
        // Tell the receive task to shut down
        if let Some(token) = self.cancellation_token.take() {
            token.cancel();
        }
        if let Some(guard) = self.cancellation_guard.take() {
            guard.disarm();
        }

        let read_result = match self.read_handle.take() {
            Some(read_handle) => read_handle.await.map_err(Error::from).and_then(|r| r),
            None => Ok(()),
        };

        // The read half is gone with the task, dropping the write half closes the port
        self.write_stream = None;

        trace!("Serial port closed");

        read_result.map(|_| SerialSession::<state::Disconnected>::default())
    }
}

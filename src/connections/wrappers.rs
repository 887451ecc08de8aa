use std::time::Duration;

use crate::errors_internal::Error;
use crate::utils_internal::DEFAULT_READ_TIMEOUT;

/// A helper struct describing one serial port reported by the host.
///
/// The `index` is only meaningful within the list it was enumerated in, and is used
/// to let the user pick a port by number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortDescriptor {
    index: usize,
    device: String,
}

impl std::fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.index, self.device)
    }
}

impl PortDescriptor {
    /// Creates a new `PortDescriptor` from a list index and a device name.
    pub fn new(index: usize, device: impl Into<String>) -> PortDescriptor {
        PortDescriptor {
            index,
            device: device.into(),
        }
    }

    /// Returns the system-specific device name of the port.
    pub fn device(&self) -> &str {
        &self.device
    }
}

/// The parameters used to open a serial session. Once a session has been opened
/// these values are fixed for its lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    port_name: String,
    baud_rate: u32,
    read_timeout: Duration,
}

impl SessionConfig {
    /// Creates a new `SessionConfig` with the default read timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidBaudRate` if `baud_rate` is zero.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Result<SessionConfig, Error> {
        if baud_rate == 0 {
            return Err(Error::InvalidBaudRate {
                input: baud_rate.to_string(),
            });
        }

        Ok(SessionConfig {
            port_name: port_name.into(),
            baud_rate,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// Returns the system-specific name of the port to open.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Returns the configured baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Returns the timeout of a single read on the port.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

pub mod encoded_data {
    /// A struct that represents incoming data read from the serial port.
    /// The wrapped data may end in the middle of a multi-byte character.
    #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct IncomingStreamData(Vec<u8>);

    impl std::fmt::Display for IncomingStreamData {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    impl IncomingStreamData {
        /// Returns a reference to the data contained within the `IncomingStreamData` struct.
        pub fn data(&self) -> &[u8] {
            &self.0
        }
    }

    impl From<Vec<u8>> for IncomingStreamData {
        fn from(value: Vec<u8>) -> Self {
            IncomingStreamData(value)
        }
    }

    impl From<&[u8]> for IncomingStreamData {
        fn from(value: &[u8]) -> Self {
            IncomingStreamData(value.to_vec())
        }
    }

    /// A struct that represents one outgoing line, encoded as UTF-8 and terminated
    /// with a single null byte. This is exactly what is written to the wire.
    #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct EncodedTxPayload(Vec<u8>);

    impl std::fmt::Display for EncodedTxPayload {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    impl EncodedTxPayload {
        /// Encodes `text` and appends the null terminator.
        pub fn from_text(text: &str) -> EncodedTxPayload {
            let mut data = Vec::with_capacity(text.len() + 1);
            data.extend_from_slice(text.as_bytes());
            data.push(0);

            EncodedTxPayload(data)
        }

        /// Returns a reference to the wire bytes, including the terminator.
        pub fn data(&self) -> &[u8] {
            &self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::encoded_data::EncodedTxPayload;
    use super::*;

    #[test]
    fn port_descriptor_displays_like_port_list_entry() {
        let port = PortDescriptor::new(2, "/dev/ttyUSB1");

        assert_eq!(port.to_string(), "#2 /dev/ttyUSB1");
    }

    #[test]
    fn session_config_rejects_zero_baud() {
        let result = SessionConfig::new("COM3", 0);

        assert!(matches!(result, Err(Error::InvalidBaudRate { .. })));
    }

    #[test]
    fn session_config_defaults() {
        let config = SessionConfig::new("COM3", 115_200).unwrap();

        assert_eq!(config.port_name(), "COM3");
        assert_eq!(config.baud_rate(), 115_200);
        assert_eq!(config.read_timeout(), DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn payload_appends_single_terminator() {
        let payload = EncodedTxPayload::from_text("hello");

        assert_eq!(payload.data(), b"hello\0");
    }

    #[test]
    fn payload_of_empty_text_is_terminator_only() {
        let payload = EncodedTxPayload::from_text("");

        assert_eq!(payload.data(), [0u8]);
    }
}

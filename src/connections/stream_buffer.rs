use log::{debug, trace};

use crate::errors_internal::Error;

use super::wrappers::encoded_data::IncomingStreamData;

/// A struct that represents a buffer of bytes received from the serial stream.
/// This struct is used to incrementally decode received bytes into text, holding
/// back a multi-byte character that has only partially arrived.
#[derive(Clone, Debug, Default)]
pub struct StreamBuffer {
    buffer: Vec<u8>,
}

impl StreamBuffer {
    /// Creates a new, empty StreamBuffer instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes in a portion of the stream, stores it in the buffer, and returns all
    /// text that can be decoded so far.
    ///
    /// Returns `Ok(None)` when the buffer only holds the start of a character.
    ///
    /// # Arguments
    ///
    /// * `message` - A chunk of bytes read from the serial stream
    ///
    /// # Errors
    ///
    /// Returns `Error::DecodeError` if the buffer contains bytes that can never
    /// form valid UTF-8. The buffer is cleared in that case.
    pub fn process_incoming_bytes(
        &mut self,
        message: IncomingStreamData,
    ) -> Result<Option<String>, Error> {
        self.buffer.extend_from_slice(message.data());

        let valid_up_to = match std::str::from_utf8(&self.buffer).map(str::len) {
            Ok(len) => len,
            // `error_len() == None` means the input ended mid-character
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                debug!("Purging {} undecodable bytes", self.buffer.len());
                self.buffer.clear();
                return Err(e.into());
            }
        };

        if valid_up_to == 0 {
            trace!("Waiting for the rest of a partial character");
            return Ok(None);
        }

        let remainder = self.buffer.split_off(valid_up_to);
        let decoded = std::mem::replace(&mut self.buffer, remainder);

        // Validated above
        let text = String::from_utf8(decoded).map_err(|e| e.utf8_error())?;

        Ok(Some(text))
    }

    /// Returns the number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ascii_chunk() {
        let mut buffer = StreamBuffer::new();

        let text = buffer.process_incoming_bytes(b"onsemi UART".as_slice().into());

        assert_eq!(text.unwrap(), Some("onsemi UART".to_string()));
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn keeps_null_terminators_verbatim() {
        let mut buffer = StreamBuffer::new();

        let text = buffer.process_incoming_bytes(b"hello\0".as_slice().into());

        assert_eq!(text.unwrap(), Some("hello\0".to_string()));
    }

    #[test]
    fn holds_back_split_character() {
        let mut buffer = StreamBuffer::new();
        let bytes = "aé".as_bytes();

        let first = buffer.process_incoming_bytes(bytes[..2].into()).unwrap();
        assert_eq!(first, Some("a".to_string()));
        assert_eq!(buffer.pending_len(), 1);

        let second = buffer.process_incoming_bytes(bytes[2..].into()).unwrap();
        assert_eq!(second, Some("é".to_string()));
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn waits_when_only_partial_character_buffered() {
        let mut buffer = StreamBuffer::new();

        let text = buffer.process_incoming_bytes(vec![0xe2, 0x82].into());

        assert_eq!(text.unwrap(), None);
        assert_eq!(buffer.pending_len(), 2);
    }

    #[test]
    fn fails_on_invalid_bytes() {
        let mut buffer = StreamBuffer::new();

        let result = buffer.process_incoming_bytes(vec![b'o', b'k', 0xff, b'x'].into());

        assert!(matches!(result, Err(Error::DecodeError { .. })));
        assert_eq!(buffer.pending_len(), 0);
    }
}

//! Packet cancellation.
//!
//! Cancelling is plain control flow: `ProtocolError::Cancelled` carries no
//! payload, so raising it costs nothing beyond returning an `Err`. Every raise
//! goes through [`cancel`], which hands out the shared [`CANCELLED`] value.

use glider_common::{ProtocolError, Result};
use tracing::trace;

/// The one cancellation value.
pub const CANCELLED: ProtocolError = ProtocolError::Cancelled;

/// Aborts processing of the current packet.
///
/// ```ignore
/// if packet.is_ignored() {
///     return cancel();
/// }
/// ```
pub fn cancel<T>() -> Result<T> {
    trace!("packet processing cancelled");
    Err(CANCELLED)
}

/// Result of a dispatch that may have been cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    /// The packet was cancelled and must be dropped without a payload.
    Dropped,
}

impl<T> Outcome<T> {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Outcome::Dropped)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Dropped => None,
        }
    }
}

/// Turns the cancellation signal into [`Outcome::Dropped`]. Every other error
/// is passed through untouched.
pub fn catch_cancel<T>(result: Result<T>) -> Result<Outcome<T>> {
    match result {
        Ok(value) => Ok(Outcome::Completed(value)),
        Err(ProtocolError::Cancelled) => Ok(Outcome::Dropped),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::FrameBuffer;
    use assert_matches::assert_matches;
    use glider_common::Severity;

    fn read_until_negative(buffer: &mut FrameBuffer) -> Result<Vec<i32>> {
        let mut values = Vec::new();
        while buffer.is_readable() {
            let value = buffer.read_varint()?;
            if value < 0 {
                return cancel();
            }
            values.push(value);
        }
        Ok(values)
    }

    #[test]
    fn test_cancel_is_the_shared_signal() {
        let error = cancel::<()>().unwrap_err();
        assert!(error.is_cancelled());
        assert_eq!(error.severity(), Severity::Cancelled);
        assert_matches!(CANCELLED, ProtocolError::Cancelled);
    }

    #[test]
    fn test_catch_cancel() {
        assert_eq!(catch_cancel(Ok(5)).unwrap(), Outcome::Completed(5));
        assert_eq!(catch_cancel::<i32>(cancel()).unwrap(), Outcome::Dropped);
        assert_matches!(
            catch_cancel::<i32>(Err(ProtocolError::invalid_data("bad"))),
            Err(ProtocolError::InvalidData(_))
        );
    }

    #[test]
    fn test_cancel_leaves_cursor_at_point_of_cancellation() {
        let mut buffer = FrameBuffer::new();
        buffer.write_varint(1);
        buffer.write_varint(300);
        buffer.write_varint(-1);
        buffer.write_varint(7);

        let mut other = FrameBuffer::new();
        other.write_varint(9);

        let outcome = catch_cancel(read_until_negative(&mut buffer)).unwrap();
        assert!(outcome.is_dropped());
        // 1 byte + 2 bytes + 5 bytes consumed, the trailing 7 is untouched
        assert_eq!(buffer.reader_index(), 8);
        assert_eq!(buffer.read_varint().unwrap(), 7);

        // an unrelated frame is unaffected
        assert_eq!(read_until_negative(&mut other).unwrap(), vec![9]);
    }
}

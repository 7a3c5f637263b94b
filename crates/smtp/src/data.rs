//! Transparency for the `DATA` payload
//! ([RFC 5321 §4.5.2](https://datatracker.ietf.org/doc/html/rfc5321#section-4.5.2)).

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    #[default]
    LineStart,
    Text,
    Cr,
}

/// Marks the end of the payload. Sent after [`encode`]d data, which always
/// ends with CRLF.
pub const TERMINATOR: &[u8] = b".\r\n";

/// Dot-stuff a message for transmission after `DATA`.
///
/// A dot at the start of a line is doubled, bare LF becomes CRLF, and the
/// result ends with CRLF unless it is empty.
///
/// ```
/// assert_eq!(
///     smtp::data::encode(b"Hi\n.\nbye"),
///     b"Hi\r\n..\r\nbye\r\n"
/// );
/// ```
#[must_use]
pub fn encode(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 2);
    let mut state = State::default();

    for &b in message {
        state = match (state, b) {
            (State::Cr, b'\n') => {
                out.push(b'\n');
                State::LineStart
            }
            (_, b'\n') => {
                out.extend_from_slice(b"\r\n");
                State::LineStart
            }
            (State::LineStart, b'.') => {
                out.extend_from_slice(b"..");
                State::Text
            }
            (_, b'\r') => {
                out.push(b'\r');
                State::Cr
            }
            (_, b) => {
                out.push(b);
                State::Text
            }
        };
    }

    match state {
        State::LineStart => {}
        State::Cr => out.push(b'\n'),
        State::Text => out.extend_from_slice(b"\r\n"),
    }

    out
}

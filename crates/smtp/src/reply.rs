//! [SMTP replies](https://datatracker.ietf.org/doc/html/rfc5321#section-4.2).
//!
//! ```txt
//! S: 250-mail.example.com greets localhost
//! S: 250-8BITMIME
//! S: 250 STARTTLS
//! ```

use std::fmt;

use line::{read_line, ReadLineError};
use nom::{
    branch::alt,
    bytes::complete::take_while_m_n,
    character::complete::char,
    combinator::{eof, map_res, value},
    sequence::tuple,
    IResult,
};
use tokio::io::{AsyncBufRead, AsyncReadExt};

use crate::LINE_LIMIT;

/// A complete, possibly multi-line, server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    lines: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("connection closed by server")]
    Closed,
    #[error("malformed reply")]
    Syntax,
    #[error("server replied: {0}")]
    Rejected(Reply),
}

impl From<ReadLineError> for Error {
    fn from(e: ReadLineError) -> Self {
        match e {
            ReadLineError::Io(e) => Self::Io(e),
            ReadLineError::Eof => Self::Closed,
        }
    }
}

/// `(code, more lines follow, text)`
fn reply_line(i: &str) -> IResult<&str, (u16, bool, &str)> {
    let (text, (code, more)) = tuple((
        map_res(take_while_m_n(3, 3, |c: char| c.is_ascii_digit()), |code: &str| {
            code.parse::<u16>()
        }),
        alt((
            value(true, char('-')),
            value(false, char(' ')),
            value(false, eof),
        )),
    ))(i)?;

    Ok(("", (code, more, text)))
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![text.into()],
        }
    }

    /// Read one reply from the stream.
    ///
    /// ```
    /// # use smtp::reply::Reply;
    /// # tokio_test::block_on(async {
    /// let mut stream = tokio::io::BufReader::new(
    ///     "250-mail.example.com\r\n250 SIZE 1024\r\n".as_bytes(),
    /// );
    /// let reply = Reply::read(&mut stream).await.unwrap();
    /// assert_eq!(reply.code(), 250);
    /// assert_eq!(reply.lines(), ["mail.example.com", "SIZE 1024"]);
    /// # });
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::Syntax`] if a line is not a reply line or the lines of a
    /// multi-line reply disagree on the code, [`Error::Closed`] if the
    /// stream ends mid-reply.
    pub async fn read<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Self, Error> {
        let mut lines = Vec::new();
        let mut first = None;

        loop {
            let mut buf = Vec::new();
            read_line(&mut reader.take(LINE_LIMIT as _), &mut buf).await?;

            let line = std::str::from_utf8(&buf).map_err(|_| Error::Syntax)?;
            let (_, (code, more, text)) = reply_line(line).map_err(|_| Error::Syntax)?;

            if *first.get_or_insert(code) != code {
                return Err(Error::Syntax);
            }

            lines.push(text.to_owned());

            if !more {
                return Ok(Self { code, lines });
            }
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The text of all lines, space separated.
    pub fn message(&self) -> String {
        self.lines.join(" ")
    }

    /// 5xx
    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }

    /// Pass the reply through if it carries `code`.
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] with the reply otherwise.
    pub fn expect(self, code: u16) -> Result<Self, Error> {
        if self.code == code {
            Ok(self)
        } else {
            Err(Error::Rejected(self))
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message())
    }
}

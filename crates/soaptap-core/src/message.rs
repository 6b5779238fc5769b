//! Message abstraction and bounded buffered replay.
//!
//! A [`Message`] body can be read exactly once. Inspection therefore goes
//! through [`BufferedCopy`]: read once into a size-capped snapshot, inspect
//! replays, then install a fresh replay as the message that continues
//! downstream.

use std::fmt;
use std::io::{Cursor, Read};

use bytes::Bytes;

use crate::error::{Result, TapError};

/// Which half of a call a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    /// Lowercase tag used in file names and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }

    /// Capitalised label used in comments and console headers.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Request => "Request",
            Direction::Response => "Response",
        }
    }

    pub fn is_request(self) -> bool {
        matches!(self, Direction::Request)
    }
}

/// Addressing metadata carried next to the body.
///
/// Values are kept as the raw bytes the transport delivered; decoding is
/// deferred to the accessors so a malformed header never blocks capture.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    action: Option<Bytes>,
    to: Option<Bytes>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the action identifier (e.g. `http://tempuri.org/IService1/Add`).
    pub fn with_action(mut self, action: impl Into<Bytes>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Set the destination address.
    pub fn with_to(mut self, to: impl Into<Bytes>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Action identifier, if present.
    pub fn action(&self) -> Result<Option<&str>> {
        decode_header(self.action.as_ref(), "action")
    }

    /// Destination address, if present.
    pub fn to(&self) -> Result<Option<&str>> {
        decode_header(self.to.as_ref(), "to")
    }
}

fn decode_header<'a>(raw: Option<&'a Bytes>, name: &str) -> Result<Option<&'a str>> {
    match raw {
        None => Ok(None),
        Some(b) => std::str::from_utf8(b)
            .map(Some)
            .map_err(|e| TapError::MetadataAccess(format!("{name} header is not valid utf-8: {e}"))),
    }
}

enum Body {
    Buffered(Bytes),
    Stream(Box<dyn Read + Send>),
    Consumed,
}

impl Body {
    fn state(&self) -> &'static str {
        match self {
            Body::Buffered(_) => "buffered",
            Body::Stream(_) => "stream",
            Body::Consumed => "consumed",
        }
    }
}

/// Single-consumption unit of request/response data.
pub struct Message {
    headers: Headers,
    body: Body,
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("headers", &self.headers)
            .field("body", &self.body.state())
            .finish()
    }
}

impl Message {
    /// Message over an in-memory body.
    pub fn from_bytes(headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            headers,
            body: Body::Buffered(body.into()),
        }
    }

    /// Message over a streaming body.
    pub fn from_reader(headers: Headers, reader: impl Read + Send + 'static) -> Self {
        Self {
            headers,
            body: Body::Stream(Box::new(reader)),
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self.body, Body::Consumed)
    }

    /// Read the whole body. A second call fails with `AlreadyConsumed`.
    pub fn read_body(&mut self) -> Result<Bytes> {
        match std::mem::replace(&mut self.body, Body::Consumed) {
            Body::Buffered(bytes) => Ok(bytes),
            Body::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
            Body::Consumed => Err(TapError::AlreadyConsumed),
        }
    }

    /// Read the whole body as text (invalid UTF-8 is replaced).
    pub fn read_text(&mut self) -> Result<String> {
        let bytes = self.read_body()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Size-bounded snapshot of a message that can be replayed any number of
/// times.
#[derive(Debug, Clone)]
pub struct BufferedCopy {
    headers: Headers,
    content: Bytes,
}

impl BufferedCopy {
    /// Read `message` once into memory.
    ///
    /// On success the message body is consumed; callers must install a
    /// [`replay`](Self::replay) in its place. On failure the message is left
    /// fully readable: any prefix already pulled from a stream is chained back
    /// in front of the unread remainder.
    pub fn capture(message: &mut Message, max_bytes: usize) -> Result<Self> {
        let headers = message.headers.clone();
        match std::mem::replace(&mut message.body, Body::Consumed) {
            Body::Consumed => Err(TapError::AlreadyConsumed),
            Body::Buffered(content) => {
                if content.len() > max_bytes {
                    message.body = Body::Buffered(content);
                    return Err(TapError::SizeExceeded { limit: max_bytes });
                }
                Ok(Self { headers, content })
            }
            Body::Stream(mut reader) => {
                let mut prefix = Vec::new();
                let limit = (max_bytes as u64).saturating_add(1);
                let read = (&mut reader).take(limit).read_to_end(&mut prefix);

                let failure = match read {
                    Err(e) => TapError::Io(e),
                    Ok(_) if prefix.len() > max_bytes => TapError::SizeExceeded { limit: max_bytes },
                    Ok(_) => {
                        return Ok(Self {
                            headers,
                            content: Bytes::from(prefix),
                        })
                    }
                };

                message.body = Body::Stream(Box::new(Cursor::new(prefix).chain(reader)));
                Err(failure)
            }
        }
    }

    /// Fresh, independent message over the snapshot.
    pub fn replay(&self) -> Message {
        Message {
            headers: self.headers.clone(),
            body: Body::Buffered(self.content.clone()),
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

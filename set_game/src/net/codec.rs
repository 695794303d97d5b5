//! Delimiter-framed JSON records.
//!
//! Every record on the wire is a JSON object followed by a single `~`:
//!
//! ```text
//! {"type":"place","args":[],"kwargs":{"card":["r","s","e",1],"x":0,"y":0}}~
//! ```
//!
//! A `~` can only appear in JSON text inside a string, so the encoder escapes
//! it there as `\u007e` and the delimiter never appears in a payload.

use log::warn;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{
    io::{self, Read, Write},
    thread,
    time::{Duration, Instant},
};

use super::errors::{CodecError, ParamError, Result};

/// Byte that terminates every record.
pub const DELIMITER: u8 = b'~';

/// Maximum allowed record size (1MB) to prevent unbounded buffering.
pub const MAX_RECORD_SIZE: usize = 1024 * 1024;

/// How long a write keeps retrying a socket that isn't ready.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between write attempts on a socket that isn't ready.
const WRITE_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Bytes read per call when pulling records from a blocking reader.
const READ_CHUNK_SIZE: usize = 4096;

/// One operation: a name plus positional and keyword arguments.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl Record {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_arg(mut self, value: Value) -> Self {
        self.args.push(value);
        self
    }

    #[must_use]
    pub fn with_kwarg(mut self, name: &str, value: Value) -> Self {
        self.kwargs.insert(name.to_string(), value);
        self
    }

    /// Bind a declared parameter, preferring the keyword form over the
    /// positional one.
    pub fn param<T: DeserializeOwned>(
        &self,
        index: usize,
        name: &'static str,
    ) -> std::result::Result<T, ParamError> {
        let value = self
            .kwargs
            .get(name)
            .or_else(|| self.args.get(index))
            .ok_or(ParamError::Missing { name, index })?;
        T::deserialize(value).map_err(|source| ParamError::Invalid { name, source })
    }

    /// Like [`Record::param`], but absent parameters are `None`.
    pub fn optional_param<T: DeserializeOwned>(
        &self,
        index: usize,
        name: &'static str,
    ) -> std::result::Result<Option<T>, ParamError> {
        match self.param::<Option<T>>(index, name) {
            Err(ParamError::Missing { .. }) => Ok(None),
            other => other,
        }
    }
}

/// Serialize a record into its delimited wire form.
pub fn encode(record: &Record) -> Result<Vec<u8>> {
    let text = serde_json::to_string(record)?.replace('~', "\\u007e");
    if text.len() > MAX_RECORD_SIZE {
        return Err(CodecError::RecordTooLarge {
            actual: text.len(),
            max: MAX_RECORD_SIZE,
        });
    }
    let mut buf = text.into_bytes();
    buf.push(DELIMITER);
    Ok(buf)
}

/// Incremental record decoder.
///
/// Bytes go in through [`Decoder::feed`] in whatever chunks the transport
/// delivers; complete records come out in arrival order and any trailing
/// partial record waits for the next feed.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes held back waiting for a delimiter.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Next well-formed record. Malformed records are logged and dropped.
    pub fn next_record(&mut self) -> Option<Record> {
        self.find_map(|result| {
            result
                .map_err(|error| warn!("dropping malformed record: {error}"))
                .ok()
        })
    }
}

impl Iterator for Decoder {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(end) = self.buf.iter().position(|&byte| byte == DELIMITER) else {
                if self.buf.len() > MAX_RECORD_SIZE {
                    let actual = self.buf.len();
                    self.buf.clear();
                    return Some(Err(CodecError::RecordTooLarge {
                        actual,
                        max: MAX_RECORD_SIZE,
                    }));
                }
                return None;
            };

            let segment: Vec<u8> = self.buf.drain(..=end).collect();
            let body = &segment[..end];
            if body.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let parsed = std::str::from_utf8(body)
                .map_err(CodecError::from)
                .and_then(|text| serde_json::from_str(text).map_err(CodecError::from));
            return Some(parsed);
        }
    }
}

/// Pulls records out of a blocking reader. Ends when the reader reaches
/// EOF or fails.
#[derive(Debug)]
pub struct RecordReader<R> {
    reader: R,
    decoder: Decoder,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: Decoder::new(),
            done: false,
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chunk = [0; READ_CHUNK_SIZE];
        loop {
            if let Some(record) = self.decoder.next_record() {
                return Some(record);
            }
            if self.done {
                return None;
            }
            match self.reader.read(&mut chunk) {
                Ok(0) => self.done = true,
                Ok(n) => self.decoder.feed(&chunk[..n]),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    warn!("read failed, ending record stream: {error}");
                    self.done = true;
                }
            }
        }
    }
}

/// Write one record, retrying while the socket isn't ready for up to
/// [`WRITE_TIMEOUT`].
pub fn write_record<W: Write>(writer: &mut W, record: &Record) -> io::Result<()> {
    let buf = encode(record).map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
    let start = Instant::now();
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => written += n,
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                if start.elapsed() >= WRITE_TIMEOUT {
                    return Err(io::ErrorKind::TimedOut.into());
                }
                thread::sleep(WRITE_RETRY_INTERVAL);
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(())
}

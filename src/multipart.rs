// Streaming multipart/form-data encoder.
//
// The body is described as a list of segments: literal bytes (field
// headers, text values, boundaries) and file regions of a known size. That
// makes the full encoded length computable up front, without reading the
// file, and lets the body be produced as a `Read` stream so the file is
// never buffered in memory.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use uuid::Uuid;

const CRLF: &str = "\r\n";

enum Segment {
    Bytes(Vec<u8>),
    File { path: PathBuf, len: u64 },
}

impl Segment {
    fn len(&self) -> u64 {
        match self {
            Segment::Bytes(bytes) => bytes.len() as u64,
            Segment::File { len, .. } => *len,
        }
    }
}

/// Builder for a multipart body. Parts are emitted in the order they are
/// added.
pub struct Form {
    boundary: String,
    segments: Vec<Segment>,
}

impl Form {
    pub(crate) fn new() -> Self {
        Self::with_boundary(format!("------------------------{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Form {
            boundary: boundary.into(),
            segments: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        let mut part = self.part_header(name, None);
        part.push_str(value);
        part.push_str(CRLF);
        self.segments.push(Segment::Bytes(part.into_bytes()));
        self
    }

    /// Add a file part. `len` is the number of bytes that will be streamed
    /// from `path`; it is what the encoded length is computed from.
    pub fn file(mut self, name: &str, file_name: &str, path: impl Into<PathBuf>, len: u64) -> Self {
        let mut header = self.part_header(name, Some(file_name));
        header.push_str("Content-Type: application/octet-stream");
        header.push_str(CRLF);
        header.push_str(CRLF);
        self.segments.push(Segment::Bytes(header.into_bytes()));
        self.segments.push(Segment::File {
            path: path.into(),
            len,
        });
        self.segments.push(Segment::Bytes(CRLF.as_bytes().to_vec()));
        self
    }

    fn part_header(&self, name: &str, file_name: Option<&str>) -> String {
        let mut header = format!(
            "--{}{CRLF}Content-Disposition: form-data; name=\"{}\"",
            self.boundary,
            escape_quoted(name)
        );
        if let Some(file_name) = file_name {
            header.push_str(&format!("; filename=\"{}\"", escape_quoted(file_name)));
        }
        header.push_str(CRLF);
        if file_name.is_none() {
            header.push_str(CRLF);
        }
        header
    }

    fn closing(&self) -> Vec<u8> {
        format!("--{}--{CRLF}", self.boundary).into_bytes()
    }

    /// Value for the `Content-Type` request header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact number of bytes `into_reader` will yield.
    pub fn content_length(&self) -> u64 {
        let parts: u64 = self.segments.iter().map(Segment::len).sum();
        parts + self.closing().len() as u64
    }

    pub fn into_reader(mut self) -> FormReader {
        let closing = self.closing();
        self.segments.push(Segment::Bytes(closing));
        FormReader {
            segments: self.segments.into_iter(),
            current: None,
        }
    }
}

// Quotes and line breaks would end the header value early.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

enum Active {
    Bytes(io::Cursor<Vec<u8>>),
    File { file: io::Take<File>, len: u64 },
}

/// Streams the encoded body. Files are opened when the reader reaches them
/// and closed as soon as their region is done (or the reader is dropped).
pub struct FormReader {
    segments: std::vec::IntoIter<Segment>,
    current: Option<Active>,
}

impl FormReader {
    fn advance(&mut self) -> io::Result<bool> {
        self.current = match self.segments.next() {
            None => return Ok(false),
            Some(Segment::Bytes(bytes)) => Some(Active::Bytes(io::Cursor::new(bytes))),
            Some(Segment::File { path, len }) => {
                let file = File::open(&path)?;
                Some(Active::File {
                    file: file.take(len),
                    len,
                })
            }
        };
        Ok(true)
    }
}

impl Read for FormReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let n = match &mut self.current {
                None => 0,
                Some(Active::Bytes(cursor)) => cursor.read(buf)?,
                Some(Active::File { file, len }) => {
                    let n = file.read(buf)?;
                    if n == 0 && file.limit() > 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            format!(
                                "file ended {} bytes short of its expected {len} bytes",
                                file.limit()
                            ),
                        ));
                    }
                    n
                }
            };
            if n > 0 {
                return Ok(n);
            }
            if !self.advance()? {
                return Ok(0);
            }
        }
    }
}

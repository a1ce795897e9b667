//! Incremental multipart/form-data state machine.
//!
//! # Responsibilities
//! - Accept body bytes in arbitrarily sized chunks
//! - Locate boundaries, header blocks, and part bodies
//! - Enforce request and field size ceilings as parts complete
//!
//! # Design Decisions
//! - One `ScanBuffer` per parser; the consumed prefix is compacted away after
//!   every feed, so only the part in flight stays resident
//! - Every search resumes where the previous miss left off, so a token that
//!   straddles two chunks is found without rescanning the body
//! - Limits are checked when a part completes, not per byte; one oversized
//!   part may be buffered before it is rejected

use axum::body::Bytes;

use crate::multipart::buffer::ScanBuffer;
use crate::multipart::part::{Part, PartHead};
use crate::multipart::{Limits, MultipartError};

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";
const CLOSE_MARKER: &[u8] = b"--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Looking for the first boundary (skipping any preamble).
    Search,
    /// Just past a boundary: a close marker or a line break follows.
    Delimiter,
    /// Accumulating the part's header block.
    Headers,
    /// Accumulating the part's body until the next boundary.
    Body,
    /// Final boundary seen; trailing bytes are ignored.
    Done,
}

/// Per-request multipart decoder.
#[derive(Debug)]
pub struct MultipartParser {
    /// `--boundary`
    delimiter: Vec<u8>,
    /// `\r\n--boundary`; the leading line break belongs to the boundary,
    /// not to the preceding body.
    body_delimiter: Vec<u8>,
    limits: Limits,
    buffer: ScanBuffer,
    state: State,
    /// Start of the unparsed region.
    cursor: usize,
    /// Where the pending token search resumes.
    scan_from: usize,
    current: Option<PartHead>,
    total_bytes: usize,
    parts: Vec<Part>,
}

impl MultipartParser {
    pub fn new(boundary: &str, limits: Limits) -> Self {
        let delimiter = [b"--".as_slice(), boundary.as_bytes()].concat();
        let body_delimiter = [CRLF, delimiter.as_slice()].concat();
        Self {
            delimiter,
            body_delimiter,
            limits,
            buffer: ScanBuffer::new(),
            state: State::Search,
            cursor: 0,
            scan_from: 0,
            current: None,
            total_bytes: 0,
            parts: Vec::new(),
        }
    }

    /// Whether the closing boundary has been seen.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Parts completed so far, in arrival order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Total body bytes of all completed parts.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Consume the parser, yielding every completed part.
    pub fn finish(self) -> Vec<Part> {
        self.parts
    }

    /// Feed the next chunk of the body.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), MultipartError> {
        if self.is_done() {
            return Ok(());
        }
        self.buffer.append(chunk);

        while self.step()? {}

        self.buffer.compact(self.cursor);
        self.scan_from = self.scan_from.saturating_sub(self.cursor);
        self.cursor = 0;
        Ok(())
    }

    /// Run one state transition. Returns `false` when more input is needed
    /// or parsing has finished.
    fn step(&mut self) -> Result<bool, MultipartError> {
        match self.state {
            State::Search => match self.buffer.find(&self.delimiter, self.scan_from) {
                Some(idx) => {
                    self.cursor = idx + self.delimiter.len();
                    self.scan_from = self.cursor;
                    self.state = State::Delimiter;
                    Ok(true)
                }
                None => {
                    // preamble before the resume point can never hold a boundary
                    self.scan_from = self.buffer.resume_offset(&self.delimiter, self.cursor);
                    self.cursor = self.scan_from;
                    Ok(false)
                }
            },
            State::Delimiter => {
                if self.buffer.matches_at(self.cursor, CLOSE_MARKER).is_none() {
                    return Ok(false);
                }
                if self.buffer.matches_at(self.cursor, CLOSE_MARKER) == Some(true) {
                    self.cursor += CLOSE_MARKER.len();
                    self.state = State::Done;
                    return Ok(false);
                }
                // anything else after the delimiter (e.g. a longer token
                // sharing its prefix) is read as the start of the headers
                if self.buffer.matches_at(self.cursor, CRLF) == Some(true) {
                    self.cursor += CRLF.len();
                }
                self.scan_from = self.cursor;
                self.state = State::Headers;
                Ok(true)
            }
            State::Headers => {
                // a bare line break means the part has no headers at all
                match self.buffer.matches_at(self.cursor, CRLF) {
                    None => return Ok(false),
                    Some(true) => {
                        self.current = Some(PartHead::default());
                        self.cursor += CRLF.len();
                        self.scan_from = self.cursor;
                        self.state = State::Body;
                        return Ok(true);
                    }
                    Some(false) => {}
                }

                match self.buffer.find(HEADER_END, self.scan_from) {
                    Some(idx) => {
                        self.current = Some(PartHead::parse(self.buffer.slice(self.cursor, idx)));
                        self.cursor = idx + HEADER_END.len();
                        self.scan_from = self.cursor;
                        self.state = State::Body;
                        Ok(true)
                    }
                    None => {
                        self.scan_from = self.buffer.resume_offset(HEADER_END, self.cursor);
                        Ok(false)
                    }
                }
            }
            State::Body => match self.buffer.find(&self.body_delimiter, self.scan_from) {
                Some(idx) => {
                    let data = Bytes::copy_from_slice(self.buffer.slice(self.cursor, idx));
                    self.finish_part(data)?;
                    self.cursor = idx + self.body_delimiter.len();
                    self.scan_from = self.cursor;
                    self.state = State::Delimiter;
                    Ok(true)
                }
                None => {
                    self.scan_from = self.buffer.resume_offset(&self.body_delimiter, self.cursor);
                    Ok(false)
                }
            },
            State::Done => Ok(false),
        }
    }

    fn finish_part(&mut self, data: Bytes) -> Result<(), MultipartError> {
        let head = self.current.take().unwrap_or_default();
        self.total_bytes += data.len();

        if self.limits.max_request_bytes > 0 && self.total_bytes > self.limits.max_request_bytes {
            self.state = State::Done;
            return Err(MultipartError::RequestTooLarge {
                limit: self.limits.max_request_bytes,
            });
        }
        if self.limits.max_field_bytes > 0 && data.len() > self.limits.max_field_bytes {
            self.state = State::Done;
            return Err(MultipartError::FieldTooLarge {
                name: head.name.unwrap_or_default(),
                limit: self.limits.max_field_bytes,
            });
        }

        match head.name {
            Some(name) => self.parts.push(Part {
                name,
                filename: head.filename,
                content_type: head.content_type,
                data,
            }),
            None => tracing::trace!(bytes = data.len(), "Dropping part without a field name"),
        }
        Ok(())
    }
}

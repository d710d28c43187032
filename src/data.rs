use flate2::bufread::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::error::DataError;

const PROGRESS_EVERY: usize = 100_000;

/// One (body, title) training pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Issue body.
    pub inputs: String,
    /// Issue title.
    pub targets: String,
}

impl Sample {
    fn from_record(record: &csv::StringRecord) -> Result<Self, DataError> {
        let line = record.position().map_or(0, |p| p.line());
        if record.len() == 1 && &record[0] == BLANK_LINE {
            return Err(DataError::ShortRow { line, fields: 0 });
        }
        match (record.get(1), record.get(2)) {
            (Some(title), Some(body)) => Ok(Self {
                inputs: body.to_owned(),
                targets: title.to_owned(),
            }),
            _ => Err(DataError::ShortRow {
                line,
                fields: record.len(),
            }),
        }
    }
}

/// Stands in for a blank source line. NULs are removed from real input, so a
/// record made of exactly this field can only come from a blank line.
const BLANK_LINE: &str = "\0";

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Start,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Presents raw CSV bytes the way a text-mode line reader sees them.
///
/// NULs are dropped, `\r\n` and a lone `\r` become `\n`, and a blank line
/// outside a quoted field is replaced by a marker row so the parser
/// reports it instead of skipping it. NUL never occurs inside a multi-byte
/// UTF-8 sequence, so working on bytes is the same as working on characters.
pub struct TextReader<R> {
    inner: R,
    chunk: Box<[u8]>,
    out: Vec<u8>,
    pos: usize,
    field: Field,
    after_cr: bool,
    // nothing but NULs since the last record break
    record_start: bool,
    // NULs seen on the current line
    line_has_nul: bool,
    eof: bool,
}

impl<R: Read> TextReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            chunk: vec![0; CHUNK_SIZE].into_boxed_slice(),
            out: Vec::with_capacity(CHUNK_SIZE),
            pos: 0,
            field: Field::Start,
            after_cr: false,
            record_start: true,
            line_has_nul: false,
            eof: false,
        }
    }

    fn push(&mut self, byte: u8) {
        match byte {
            0 => {
                self.after_cr = false;
                self.line_has_nul = true;
            }
            b'\r' => {
                self.newline();
                self.after_cr = true;
            }
            b'\n' if self.after_cr => self.after_cr = false,
            b'\n' => self.newline(),
            _ => {
                self.after_cr = false;
                self.record_start = false;
                self.field = match (self.field, byte) {
                    (Field::Start, b'"') => Field::Quoted,
                    (Field::Quoted, b'"') => Field::QuoteInQuoted,
                    (Field::QuoteInQuoted, b'"') => Field::Quoted,
                    (Field::Quoted, _) => Field::Quoted,
                    (_, b',') => Field::Start,
                    _ => Field::Unquoted,
                };
                self.out.push(byte);
            }
        }
    }

    fn newline(&mut self) {
        if self.field != Field::Quoted {
            if self.record_start {
                self.out.extend_from_slice(BLANK_LINE.as_bytes());
            }
            self.record_start = true;
            self.field = Field::Start;
        }
        self.line_has_nul = false;
        self.out.push(b'\n');
    }

    fn finish(&mut self) {
        // a last line holding only NULs is still a line
        if self.record_start && self.line_has_nul {
            self.out.extend_from_slice(BLANK_LINE.as_bytes());
            self.out.push(b'\n');
        }
        self.eof = true;
    }
}

impl<R: Read> Read for TextReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.out.len() {
            if self.eof {
                return Ok(0);
            }
            self.out.clear();
            self.pos = 0;
            let n = self.inner.read(&mut self.chunk)?;
            if n == 0 {
                self.finish();
                continue;
            }
            for i in 0..n {
                let byte = self.chunk[i];
                self.push(byte);
            }
        }
        let n = buf.len().min(self.out.len() - self.pos);
        buf[..n].copy_from_slice(&self.out[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Opens an issue CSV, transparently decompressing `.gz` files.
pub fn open_source(path: &Path) -> Result<Box<dyn Read + Send>, DataError> {
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bufreader = BufReader::new(file);
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(GzDecoder::new(bufreader)))
    } else {
        Ok(Box::new(bufreader))
    }
}

/// Lazy stream of samples over raw issue records, capped at `max_samples`.
///
/// The stream is fused: once the cap, the end of input or an error has been
/// reached, `next` keeps returning `None`.
pub struct Samples<R: Read> {
    records: csv::StringRecordsIntoIter<TextReader<R>>,
    emitted: usize,
    max_samples: usize,
    finished: bool,
}

impl<R: Read> Samples<R> {
    pub fn from_reader(reader: R, max_samples: usize) -> Self {
        let records = csv::ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(false)
            .flexible(true)
            .from_reader(TextReader::new(reader))
            .into_records();
        Self {
            records,
            emitted: 0,
            max_samples,
            finished: false,
        }
    }

    /// Number of samples handed out so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl<R: Read> Iterator for Samples<R> {
    type Item = Result<Sample, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.emitted >= self.max_samples {
            info!(samples = self.emitted, "sample cap reached");
            self.finish();
            return None;
        }

        let record = match self.records.next() {
            None => {
                info!(samples = self.emitted, "end of issue records");
                self.finish();
                return None;
            }
            Some(Err(err)) => {
                self.finish();
                return Some(Err(err.into()));
            }
            Some(Ok(record)) => record,
        };

        match Sample::from_record(&record) {
            Ok(sample) => {
                self.emitted += 1;
                if self.emitted % PROGRESS_EVERY == 0 {
                    debug!(samples = self.emitted, "generating samples");
                }
                Some(Ok(sample))
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }
}

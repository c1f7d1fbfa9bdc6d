use std::io::BufRead;

use bioshell_io::open_file;

use crate::errors::TopologyError;

/// Physical record length cap; longer lines are truncated, not wrapped.
pub const MAX_RECORD_LENGTH: usize = 512;

/// A single physical line read from a topology file, with its 1-based line number.
#[derive(Clone, Debug)]
pub struct RawLine {
    pub text: String,
    pub line_no: usize,
}

/// Streams physical lines out of a topology (or fragment) file.
///
/// [`LineSource`] is *peek-aware*: after [`next_line()`](LineSource::next_line)
/// returns a line, a caller further up the stack may push it back with
/// [`unread()`](LineSource::unread) so the next read sees it again. Only one
/// line of pushback is ever needed — the preprocessor and the section
/// dispatcher never look more than one line ahead.
pub struct LineSource {
    reader: Box<dyn BufRead>,
    path: String,
    line_no: usize,
    pending: Option<RawLine>,
}

impl LineSource {
    /// Opens `path` (transparently decompressing `.gz` files, like every other
    /// BioShell reader) as a fresh line source.
    pub fn open(path: &str) -> Result<Self, TopologyError> {
        let reader = open_file(path).map_err(|source| TopologyError::Io { path: path.to_string(), source })?;
        Ok(Self { reader, path: path.to_string(), line_no: 0, pending: None })
    }

    /// The path this source was opened from, used for diagnostics.
    pub fn path(&self) -> &str { &self.path }

    /// Reads the next physical line, or `None` at end of file.
    ///
    /// A pending [`unread()`](LineSource::unread)'d line is returned first,
    /// without touching the underlying reader or the line counter.
    pub fn next_line(&mut self) -> Result<Option<RawLine>, TopologyError> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }

        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf)
            .map_err(|source| TopologyError::Io { path: self.path.clone(), source })?;
        if n == 0 {
            return Ok(None);
        }

        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        if buf.len() > MAX_RECORD_LENGTH {
            buf.truncate(MAX_RECORD_LENGTH);
        }

        self.line_no += 1;
        Ok(Some(RawLine { text: buf, line_no: self.line_no }))
    }

    /// Pushes `line` back so the next call to [`next_line()`](LineSource::next_line)
    /// returns it again.
    pub fn unread(&mut self, line: RawLine) {
        debug_assert!(self.pending.is_none(), "LineSource only supports a single line of pushback");
        self.pending = Some(line);
    }
}

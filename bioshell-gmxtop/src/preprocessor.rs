use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::errors::TopologyError;
use crate::lexer::{is_preprocessor_directive, is_section_header, strip_comments};
use crate::line_source::{LineSource, RawLine};

/// Soft cap on the number of distinct `#define` symbols; exceeding it warns
/// and drops the new symbol rather than failing the parse.
pub const MAX_DEFINES: usize = 100;
/// Hard cap on `#ifdef`/`#ifndef` nesting depth.
pub const MAX_CONDITIONAL_DEPTH: usize = 20;
/// Hard cap on `#include` nesting depth.
pub const MAX_INCLUDE_DEPTH: usize = 100;

/// An effective event produced by the preprocessor: either a section header
/// or a single record line. Directive lines and content hidden behind a
/// false conditional have already been filtered out by the time an [`Event`]
/// is produced — the section dispatcher never needs to know a directive was
/// there at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Section(String),
    Record(String),
}

struct Frame {
    source: LineSource,
    dir: PathBuf,
}

/// Flattens a topology file and its transitive `#include`s into a single
/// stream of [`Event`]s, applying `#define`/`#ifdef`/`#ifndef`/`#else`/`#endif`
/// conditional compilation along the way.
///
/// This is the "iterator sandwich" described in the design notes: rather than
/// re-seeking the file position and re-entering a record parser after every
/// directive, the preprocessor simply keeps producing events — directive
/// handling and re-entry are both implicit in iteration order.
pub struct Preprocessor {
    frames: Vec<Frame>,
    defines: HashSet<String>,
    cond_stack: Vec<bool>,
}

impl Preprocessor {
    pub fn open(path: &str) -> Result<Self, TopologyError> {
        let source = LineSource::open(path)?;
        let dir = Path::new(path).parent().map(|p| p.to_path_buf()).unwrap_or_default();
        Ok(Self { frames: vec![Frame { source, dir }], defines: HashSet::new(), cond_stack: Vec::new() })
    }

    fn is_active(&self) -> bool {
        self.cond_stack.iter().all(|&b| b)
    }

    fn add_define(&mut self, symbol: &str) {
        if self.defines.contains(symbol) {
            return; // redefinition is a silent no-op
        }
        if self.defines.len() >= MAX_DEFINES {
            log::warn!("maximum number of #define symbols ({MAX_DEFINES}) exceeded, dropping '{symbol}'");
            return;
        }
        log::debug!("defined symbol: {symbol}");
        self.defines.insert(symbol.to_string());
    }

    fn push_conditional(&mut self, symbol: &str, is_ifndef: bool, file: &str, line_no: usize) -> Result<(), TopologyError> {
        if self.cond_stack.len() >= MAX_CONDITIONAL_DEPTH {
            return Err(TopologyError::ConditionalNestingTooDeep {
                file: file.to_string(),
                line: line_no,
                max: MAX_CONDITIONAL_DEPTH,
            });
        }
        let mut condition = self.defines.contains(symbol);
        if is_ifndef {
            condition = !condition;
        }
        log::debug!(
            "{} {symbol} -> {}",
            if is_ifndef { "#ifndef" } else { "#ifdef" },
            if condition { "true (processing)" } else { "false (skipping)" }
        );
        self.cond_stack.push(condition);
        Ok(())
    }

    fn push_include(&mut self, raw_path: &str, file: &str, line_no: usize) -> Result<(), TopologyError> {
        if self.frames.len() >= MAX_INCLUDE_DEPTH {
            return Err(TopologyError::IncludeNestingTooDeep { file: file.to_string(), line: line_no, max: MAX_INCLUDE_DEPTH });
        }
        let current_dir = self.frames.last().unwrap().dir.clone();
        let candidate = Path::new(raw_path);
        let resolved = if candidate.is_absolute() { candidate.to_path_buf() } else { current_dir.join(candidate) };
        let resolved_str = resolved.to_string_lossy().to_string();
        log::info!("including file: {resolved_str} (depth {})", self.frames.len());
        let source = LineSource::open(&resolved_str)?;
        let dir = resolved.parent().map(|p| p.to_path_buf()).unwrap_or_default();
        self.frames.push(Frame { source, dir });
        Ok(())
    }

    /// Handles one directive line. `content` is the directive text with any
    /// trailing `;` comment already stripped (comment-stripping is safe here
    /// — only the *detection* of a directive line must happen on the raw text).
    ///
    /// `#define`/`#ifdef`/`#ifndef`/`#else`/`#endif` are evaluated
    /// unconditionally, even inside a currently-false conditional block —
    /// that is what lets a nested `#ifdef` inside an inactive branch still
    /// push and later pop correctly. `#include`, by contrast, injects body
    /// content and is only honored while active.
    fn handle_directive(&mut self, content: &str, file: &str, line_no: usize) -> Result<(), TopologyError> {
        if let Some(rest) = content.strip_prefix("#define") {
            if let Some(symbol) = rest.split_whitespace().next() {
                self.add_define(symbol);
            }
        } else if let Some(rest) = content.strip_prefix("#ifndef") {
            let symbol = rest.split_whitespace().next().unwrap_or("");
            self.push_conditional(symbol, true, file, line_no)?;
        } else if let Some(rest) = content.strip_prefix("#ifdef") {
            let symbol = rest.split_whitespace().next().unwrap_or("");
            self.push_conditional(symbol, false, file, line_no)?;
        } else if content.starts_with("#else") {
            if self.cond_stack.is_empty() {
                return Err(TopologyError::UnmatchedElse { file: file.to_string(), line: line_no });
            }
            let top = self.cond_stack.last_mut().unwrap();
            *top = !*top;
            log::debug!("#else -> {}", if *top { "true (processing)" } else { "false (skipping)" });
        } else if content.starts_with("#endif") {
            if self.cond_stack.is_empty() {
                return Err(TopologyError::UnmatchedEndif { file: file.to_string(), line: line_no });
            }
            self.cond_stack.pop();
        } else if let Some(rest) = content.strip_prefix("#include") {
            if self.is_active() {
                if let Some(path) = parse_include_path(rest) {
                    self.push_include(&path, file, line_no)?;
                }
            }
        }
        // Any other `#...` line is an unrecognized directive; consume and ignore.
        Ok(())
    }

    /// Pulls the next effective event, or `None` once every frame (the
    /// primary file and all of its transitive includes) is exhausted.
    pub fn next_event(&mut self) -> Result<Option<Event>, TopologyError> {
        loop {
            if self.frames.is_empty() {
                return Ok(None);
            }
            let file = self.frames.last().unwrap().source.path().to_string();
            let raw = self.frames.last_mut().unwrap().source.next_line()?;
            let raw: RawLine = match raw {
                Some(raw) => raw,
                None => {
                    self.frames.pop();
                    if self.frames.is_empty() && !self.cond_stack.is_empty() {
                        log::warn!(
                            "{} unmatched #ifdef/#ifndef directive(s) at end of input (last file: '{file}')",
                            self.cond_stack.len()
                        );
                    }
                    continue;
                }
            };

            if is_preprocessor_directive(&raw.text) {
                let content = strip_comments(&raw.text).unwrap_or_default();
                self.handle_directive(&content, &file, raw.line_no)?;
                continue;
            }

            let Some(stripped) = strip_comments(&raw.text) else { continue };

            if !self.is_active() {
                continue;
            }

            if let Some(name) = is_section_header(&stripped) {
                return Ok(Some(Event::Section(name)));
            }
            return Ok(Some(Event::Record(stripped)));
        }
    }
}

fn parse_include_path(rest: &str) -> Option<String> {
    let trimmed = rest.trim_start();
    let quote = trimmed.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let body = &trimmed[quote.len_utf8()..];
    let end = body.find(quote)?;
    Some(body[..end].to_string())
}

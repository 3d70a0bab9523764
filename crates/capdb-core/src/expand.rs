//! `tc=` reference expansion.
//!
//! A record may end (or contain) `tc=name` fields. Each one is replaced by
//! the fields of the named record, itself fully expanded, so the caller gets
//! a self-contained record. Fields earlier in the record take precedence over
//! the ones spliced in after them, which is what lets `xx@` cancel an
//! inherited capability.
//!
//! The only loop guard is the depth ceiling: two records naming each other
//! nest until the ceiling is exceeded and the whole call fails. Nesting is
//! kept on an explicit stack of frames, so the ceiling costs heap, not call
//! stack.

use crate::error::{CapError, Result};
use crate::field::{self, STRING};
use crate::locate::{Located, Locator, OpenSource, Origin};
use crate::record::{reserve_chunked, CapabilityRecord, RECORD_FRAG};
use std::mem;
use std::ops::Range;
use tracing::{debug, trace};

const TC: &str = "tc";

/// A fully expanded record and what could not be resolved on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub record: CapabilityRecord,
    /// Names of referenced records that were not found, outermost first.
    pub missing: Vec<String>,
    /// Some record in the chain came from a store that flagged it as
    /// partially unresolved.
    pub tc_error: bool,
}

impl Expansion {
    pub fn is_partial(&self) -> bool {
        self.tc_error || !self.missing.is_empty()
    }
}

/// A record part-way through expansion.
struct Frame {
    bytes: Vec<u8>,
    /// Where the search for the next `tc` field resumes.
    scan: usize,
    /// First source this record's references are looked up in.
    start: usize,
    /// `sources[start]`, when this frame opened it.
    open: Option<OpenSource>,
    /// The `tc` field in the parent record this one replaces.
    target: Range<usize>,
    missing: Vec<String>,
    tc_error: bool,
}

impl Frame {
    fn top(record: CapabilityRecord) -> Self {
        Self {
            bytes: record.into_bytes(),
            scan: 0,
            start: 0,
            open: None,
            target: 0..0,
            missing: Vec::new(),
            tc_error: false,
        }
    }

    fn located(located: Located, target: Range<usize>) -> Self {
        let Located {
            record,
            origin,
            cursor,
        } = located;
        Self {
            bytes: record.into_bytes(),
            scan: 0,
            start: cursor.index,
            open: cursor.handle,
            target,
            missing: Vec::new(),
            tc_error: matches!(origin, Origin::HashStore { tc_error: true }),
        }
    }

    /// Splice a finished child in place of the `tc` field it replaces.
    fn absorb(&mut self, child: Frame) -> Result<()> {
        self.tc_error |= child.tc_error;
        self.missing.extend(child.missing);

        let body = splice_body(&child.bytes)?;
        let Range {
            start: field_start,
            end: field_end,
        } = child.target;
        let removed = field_end - field_start;
        if body.len() > removed {
            reserve_chunked(&mut self.bytes, body.len() - removed, RECORD_FRAG)?;
        }
        let body_len = body.len();
        self.bytes.splice(field_start..field_end, body);

        // Resume on the spliced terminator (or the `:` before the
        // reference when nothing was inserted); find_field_from skips
        // past it.
        self.scan = (field_start + body_len).saturating_sub(1);
        Ok(())
    }

    fn finish(self) -> Expansion {
        Expansion {
            record: CapabilityRecord::from(self.bytes),
            missing: self.missing,
            tc_error: self.tc_error,
        }
    }
}

/// The open source references of `current` resolve through: its own, or the
/// nearest ancestor's, which is on the same source.
fn open_source<'f>(
    current: &'f mut Frame,
    parents: &'f mut [Frame],
) -> Option<&'f mut OpenSource> {
    match current.open.as_mut() {
        Some(own) => Some(own),
        None => parents.iter_mut().rev().find_map(|frame| frame.open.as_mut()),
    }
}

/// Resolves names and expands their references.
#[derive(Debug, Clone, Copy)]
pub struct Expander<'a> {
    locator: Locator<'a>,
    max_depth: usize,
}

impl<'a> Expander<'a> {
    pub fn new(locator: Locator<'a>, max_depth: usize) -> Self {
        Self { locator, max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Locate `name` in the sources and expand it.
    pub fn resolve(&self, name: &str) -> Result<Expansion> {
        let located = self.locator.locate(name, 0, None)?;
        self.run(Frame::located(located, 0..0))
    }

    /// Expand every `tc` reference in `record`, searching every source.
    pub fn expand(&self, record: CapabilityRecord) -> Result<Expansion> {
        self.run(Frame::top(record))
    }

    fn run(&self, mut current: Frame) -> Result<Expansion> {
        let mut parents: Vec<Frame> = Vec::new();

        loop {
            let Some((value_start, value_end)) =
                field::find_field_from(&current.bytes, current.scan, TC, STRING)
                    .map(|found| (found.start, found.end))
            else {
                match parents.pop() {
                    Some(mut parent) => {
                        parent.absorb(current)?;
                        current = parent;
                        continue;
                    }
                    None => return Ok(current.finish()),
                }
            };

            let field_start = value_start - TC.len() - 1;
            // Swallow the field's own terminator; the spliced body brings one.
            let field_end = if value_end < current.bytes.len() {
                value_end + 1
            } else {
                value_end
            };
            let inner_name =
                String::from_utf8_lossy(&current.bytes[value_start..value_end]).into_owned();

            let depth = parents.len() + 1;
            if depth > self.max_depth {
                return Err(CapError::CycleExceeded {
                    name: inner_name,
                    depth,
                    max: self.max_depth,
                });
            }

            trace!(name = %inner_name, depth, "Expanding reference");
            let start = current.start;
            let shared = open_source(&mut current, &mut parents);
            match self.locator.locate(&inner_name, start, shared) {
                Ok(located) => {
                    let child = Frame::located(located, field_start..field_end);
                    parents.push(mem::replace(&mut current, child));
                }
                Err(CapError::NotFound { .. }) => {
                    debug!(name = %inner_name, depth, "Reference not found, kept literally");
                    current.missing.push(inner_name);
                    current.scan = value_end;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// The fields of an expanded record, without its name field, ending in `:`.
fn splice_body(record: &[u8]) -> Result<Vec<u8>> {
    let after_names = record
        .iter()
        .position(|&b| b == b':')
        .map_or(record.len(), |colon| colon + 1);
    let fields = &record[after_names..];

    let mut body = Vec::new();
    reserve_chunked(&mut body, fields.len() + 1, fields.len() + 1)?;
    body.extend_from_slice(fields);
    if !body.is_empty() && body.last() != Some(&b':') {
        body.push(b':');
    }
    Ok(body)
}

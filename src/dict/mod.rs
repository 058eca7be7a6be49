//! Conversion mappings and the shared matching/enumeration/composition logic
//!
//! A mapping stores entries of key -> ordered candidate values (first is the
//! default). Three backends share identical lookup semantics and differ only
//! in lookup strategy: [`PlainDict`] probes decreasing lengths under a global
//! bound, [`Table`] narrows the probe with a prefix cache, [`Trie`] walks a
//! prefix tree.

use std::collections::HashSet;

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::unicode;

mod format;
mod plain;
mod table;
mod trie;

pub use format::{DictFormat, Mode};
pub use plain::PlainDict;
pub use table::Table;
pub use trie::Trie;

/// A successful lookup: the longest key starting exactly at `start`, with
/// `end` not exceeding the probe bound.
#[derive(Debug, Clone, PartialEq)]
pub struct DictMatch<'t, 'd> {
    /// Matched span of composite units.
    pub units: &'t [String],
    /// Candidate values for the matched key.
    pub values: &'d [String],
    pub start: usize,
    pub end: usize,
}

/// One converted span: the source units and their candidate values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conv {
    pub units: Vec<String>,
    pub values: Vec<String>,
}

impl Conv {
    /// The source text of the span.
    pub fn key(&self) -> String {
        self.units.concat()
    }

    /// The default (first) candidate.
    pub fn default_value(&self) -> &str {
        &self.values[0]
    }
}

/// One span of converter output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvPart {
    /// A unit with no matching entry, passed through unchanged.
    Literal(String),
    /// A matched span with its candidates.
    Converted(Conv),
    /// Text withheld from conversion by an exclusion pattern.
    Excluded(String),
}

impl ConvPart {
    /// Text this part contributes under default conversion.
    pub fn default_text(&self) -> &str {
        match self {
            ConvPart::Literal(text) | ConvPart::Excluded(text) => text,
            ConvPart::Converted(conv) => conv.default_value(),
        }
    }
}

// Event-stream shape: a literal is a plain string, a conversion is
// [[units...],[values...]], an excluded span is ["text"].
impl Serialize for ConvPart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConvPart::Literal(text) => serializer.serialize_str(text),
            ConvPart::Converted(conv) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&conv.units)?;
                seq.serialize_element(&conv.values)?;
                seq.end()
            }
            ConvPart::Excluded(text) => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(text)?;
                seq.end()
            }
        }
    }
}

/// Lazy single-pass application of a mapping over a unit sequence.
///
/// At each cursor position the longest match is emitted and the cursor jumps
/// to its end; without a match the literal unit is emitted and the cursor
/// advances by one. No backtracking.
pub struct Apply<'d, D> {
    dict: &'d D,
    units: Vec<String>,
    pos: usize,
}

impl<'d, D: Dict> Iterator for Apply<'d, D> {
    type Item = ConvPart;

    fn next(&mut self) -> Option<ConvPart> {
        if self.pos >= self.units.len() {
            return None;
        }
        match self.dict.match_at(&self.units, self.pos, self.units.len()) {
            Some(m) => {
                let part = ConvPart::Converted(Conv {
                    units: m.units.to_vec(),
                    values: m.values.to_vec(),
                });
                self.pos = m.end;
                Some(part)
            }
            None => {
                let unit = self.units[self.pos].clone();
                self.pos += 1;
                Some(ConvPart::Literal(unit))
            }
        }
    }
}

/// Exploration state for exhaustive enumeration: output so far, next unit
/// index, number of non-literal steps taken.
#[derive(Debug, Clone)]
struct EnumState {
    out: String,
    pos: usize,
    matched: usize,
}

/// Push the branches for one match: every candidate value, preceded on the
/// stack by the virtual self candidate when requested (so candidates pop
/// first, in order, then the self branch).
fn push_branches<'t, 'd>(
    stack: &mut Vec<EnumState>,
    state: &EnumState,
    m: &DictMatch<'t, 'd>,
    include_self: bool,
) {
    if include_self {
        let key = m.units.concat();
        if !m.values.iter().any(|v| *v == key) {
            stack.push(EnumState {
                out: format!("{}{}", state.out, key),
                pos: m.end,
                matched: state.matched + 1,
            });
        }
    }
    for value in m.values.iter().rev() {
        stack.push(EnumState {
            out: format!("{}{}", state.out, value),
            pos: m.end,
            matched: state.matched + 1,
        });
    }
}

/// Default-path application returning the converted text and whether any
/// entry matched at all.
fn apply_checked<D: Dict>(dict: &D, text: &str) -> (String, bool) {
    let mut out = String::new();
    let mut converted = false;
    for part in dict.apply(text) {
        if matches!(part, ConvPart::Converted(_)) {
            converted = true;
        }
        out.push_str(part.default_text());
    }
    (out, converted)
}

/// Shared mapping interface implemented by all three backends.
///
/// Entries with an empty value list are present for iteration and `contains`
/// but logically absent for matching; they are never physically compacted.
pub trait Dict: Default {
    /// Number of entries, inert ones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidate values for an exact key, `Some(&[])` for an inert entry.
    fn get(&self, key: &str) -> Option<&[String]>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Append `values` to the entry for `key`, creating it if needed.
    /// Values already present are skipped unless `skip_dedup` requests an
    /// explicit bulk append.
    fn add(&mut self, key: &str, values: &[String], skip_dedup: bool);

    /// Remove an entry, returning its values if it existed.
    fn remove(&mut self, key: &str) -> Option<Vec<String>>;

    /// Ordered iteration over entries. Plain and indexed backends yield
    /// insertion order; the trie yields a deterministic depth-first order.
    fn iter(&self) -> Box<dyn Iterator<Item = (String, &[String])> + '_>;

    /// The longest key starting exactly at `pos` with end not exceeding
    /// `maxpos`, probed against the unit sequence. Entries with empty value
    /// lists never match.
    fn match_at<'t>(
        &self,
        units: &'t [String],
        pos: usize,
        maxpos: usize,
    ) -> Option<DictMatch<'t, '_>>;

    /// Owned snapshot of all entries in iteration order.
    fn entries(&self) -> Vec<(String, Vec<String>)> {
        self.iter().map(|(k, v)| (k, v.to_vec())).collect()
    }

    /// Entries whose key or any value contains `keyword`.
    fn find(&self, keyword: &str) -> Vec<(String, Vec<String>)> {
        self.iter()
            .filter(|(k, vals)| k.contains(keyword) || vals.iter().any(|v| v.contains(keyword)))
            .map(|(k, v)| (k, v.to_vec()))
            .collect()
    }

    /// Merge every entry of `other` into `self`.
    fn update<O: Dict>(&mut self, other: &O)
    where
        Self: Sized,
    {
        for (key, values) in other.iter() {
            self.add(&key, values, false);
        }
    }

    /// Invert keys and values: one output entry per (key, value) pair, values
    /// merged under the same new key in discovery order.
    fn swap(&self) -> Self
    where
        Self: Sized,
    {
        let mut out = Self::default();
        for (key, values) in self.iter() {
            for value in values {
                out.add(value, std::slice::from_ref(&key), false);
            }
        }
        out
    }

    /// Lazily convert `text`, yielding literal and converted spans.
    fn apply(&self, text: &str) -> Apply<'_, Self>
    where
        Self: Sized,
    {
        Apply {
            dict: self,
            units: unicode::split(text),
            pos: 0,
        }
    }

    /// Default-candidate conversion of the whole text.
    fn apply_default(&self, text: &str) -> String
    where
        Self: Sized,
    {
        apply_checked(self, text).0
    }

    /// Enumerate every full-text conversion of `text`, deduplicated in
    /// discovery order. Never empty: falls back to `[text]` when no entry
    /// ever matches.
    ///
    /// `include_short` additionally explores every shorter match at each
    /// position; when not even a length-1 match exists the descent bottoms
    /// out with a literal one-unit advance, so a long match cannot steal a
    /// unit from a non-overlapping downstream match. `include_self` injects
    /// the matched span's own text as a virtual extra candidate without
    /// writing it back to the mapping.
    fn apply_enum(&self, text: &str, include_short: bool, include_self: bool) -> Vec<String>
    where
        Self: Sized,
    {
        self.apply_enum_bounded(text, include_short, include_self, usize::MAX)
            .0
    }

    /// [`Dict::apply_enum`] with a step budget. Exploration uses an explicit
    /// state stack; once `max_steps` states have been expanded the search
    /// stops and the second component reports the truncation.
    fn apply_enum_bounded(
        &self,
        text: &str,
        include_short: bool,
        include_self: bool,
        max_steps: usize,
    ) -> (Vec<String>, bool)
    where
        Self: Sized,
    {
        let units = unicode::split(text);
        let mut results: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack = vec![EnumState {
            out: String::new(),
            pos: 0,
            matched: 0,
        }];
        let mut steps = 0usize;
        let mut truncated = false;

        while let Some(state) = stack.pop() {
            steps += 1;
            if steps > max_steps {
                truncated = true;
                break;
            }
            if state.pos >= units.len() {
                if state.matched > 0 && seen.insert(state.out.clone()) {
                    results.push(state.out);
                }
                continue;
            }
            let Some(m) = self.match_at(&units, state.pos, units.len()) else {
                stack.push(EnumState {
                    out: format!("{}{}", state.out, units[state.pos]),
                    pos: state.pos + 1,
                    matched: state.matched,
                });
                continue;
            };
            if include_short {
                // descend through every shorter match; when no length-1 match
                // exists the descent ends with an atomic literal step
                let mut end = m.end - 1;
                while end > state.pos {
                    match self.match_at(&units, state.pos, end) {
                        Some(m2) => {
                            push_branches(&mut stack, &state, &m2, include_self);
                            end = m2.end - 1;
                        }
                        None => {
                            stack.push(EnumState {
                                out: format!("{}{}", state.out, units[state.pos]),
                                pos: state.pos + 1,
                                matched: state.matched,
                            });
                            break;
                        }
                    }
                }
            }
            push_branches(&mut stack, &state, &m, include_self);
        }

        if results.is_empty() {
            results.push(text.to_string());
        }
        (results, truncated)
    }

    /// Compose `self` (applied first) with `other` (applied second) into one
    /// mapping equivalent to applying both in sequence.
    fn join<O: Dict>(&self, other: &O) -> Self
    where
        Self: Sized,
    {
        let mut result = self.join_postfix(other);
        result.update(&other.join_prefix(self));
        result
    }

    /// Postfix pass: replace every value of `self` with its full enumeration
    /// under `other`, then union `other` so its own keys stay reachable.
    fn join_postfix<O: Dict>(&self, other: &O) -> Self
    where
        Self: Sized,
    {
        let mut result = Self::default();
        for (key, values) in self.iter() {
            let mut newvalues: Vec<String> = Vec::new();
            for value in values {
                for conv in other.apply_enum(value, false, false) {
                    if !newvalues.contains(&conv) {
                        newvalues.push(conv);
                    }
                }
            }
            result.add(&key, &newvalues, false);
        }
        for (key, values) in other.iter() {
            result.add(&key, values, false);
        }
        result
    }

    /// Prefix pass, with `self` applied second and `first` applied first:
    /// recover every `first`-source string that could produce a prefix of a
    /// key of `self`, and map it to the composed target. When the pipeline's
    /// default path leaves the source unconverted by the second stage, the
    /// source itself is kept as the default so the original text stays
    /// reachable.
    fn join_prefix<O: Dict>(&self, first: &O) -> Self
    where
        Self: Sized,
    {
        let mut result = Self::default();
        for (key, values) in self.iter() {
            result.add(&key, values, false);
        }
        let swapped = first.swap();
        for (key, values) in self.iter() {
            if values.is_empty() {
                continue;
            }
            for newkey in swapped.apply_enum(&key, true, true) {
                let first_out = first.apply_default(&newkey);
                let (out, converted) = apply_checked(self, &first_out);
                let default = if converted { out } else { newkey.clone() };
                let mut newvalues = Vec::with_capacity(values.len() + 1);
                newvalues.push(default);
                for value in values {
                    if !newvalues.contains(value) {
                        newvalues.push(value.clone());
                    }
                }
                result.add(&newkey, &newvalues, false);
            }
        }
        result
    }

    /// Load a dictionary file, resolving the format from the extension once
    /// at this boundary.
    fn load_path(&mut self, path: &std::path::Path) -> crate::Result<()>
    where
        Self: Sized,
    {
        self.load_path_as(path, DictFormat::from_path(path))
    }

    /// Load a dictionary file in an explicitly chosen format.
    fn load_path_as(&mut self, path: &std::path::Path, fmt: DictFormat) -> crate::Result<()>
    where
        Self: Sized,
    {
        let text = std::fs::read_to_string(path)?;
        let source = path.display().to_string();
        let before = self.len();
        match fmt {
            DictFormat::List => format::parse_list(self, &text, &source)?,
            DictFormat::Jlist => format::parse_flat_json(self, &text, &source)?,
            DictFormat::Tlist => format::parse_trie_json(self, &text, &source)?,
        }
        log::debug!(
            "loaded {} ({:?}): {} entries ({} new)",
            source,
            fmt,
            self.len(),
            self.len() - before
        );
        Ok(())
    }

    /// Write the plain line format. `sort` orders entries by key instead of
    /// insertion order; `check` aborts with nothing written when a key or
    /// value contains a record separator.
    fn dump<W: std::io::Write>(&self, writer: &mut W, sort: bool, check: bool) -> crate::Result<()>
    where
        Self: Sized,
    {
        format::dump_list(self, writer, sort, check)
    }

    /// Write the flat JSON format in iteration order.
    fn dump_json<W: std::io::Write>(&self, writer: &mut W) -> crate::Result<()>
    where
        Self: Sized,
    {
        format::dump_flat_json(self, writer)
    }

    /// Write the nested trie JSON format.
    fn dump_trie_json<W: std::io::Write>(&self, writer: &mut W) -> crate::Result<()>
    where
        Self: Sized,
    {
        format::dump_trie_json(self, writer)
    }
}

/// Combine source dictionaries under a composition mode: `Load` merges,
/// `Swap` merges then inverts, `Join` folds sequential composition.
pub fn combine<D: Dict>(mode: Mode, dicts: Vec<D>) -> D {
    let mut iter = dicts.into_iter();
    let Some(first) = iter.next() else {
        return D::default();
    };
    match mode {
        Mode::Load => {
            let mut out = first;
            for d in iter {
                out.update(&d);
            }
            out
        }
        Mode::Swap => combine(Mode::Load, std::iter::once(first).chain(iter).collect()).swap(),
        Mode::Join => {
            let mut out = first;
            for d in iter {
                out = out.join(&d);
            }
            out
        }
    }
}

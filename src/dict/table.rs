//! Indexed backend: a plain map plus a lazily built prefix cache
//!
//! The cache maps the first two units of every multi-unit key to the longest
//! such key sharing that prefix. A lookup then probes long keys only when the
//! two-unit prefix is known to start one, instead of scanning every length up
//! to the global bound. The cache is built on first lookup and dropped on
//! every mutation.

use std::collections::HashMap;

use once_cell::sync::OnceCell;

use super::{Dict, DictMatch, PlainDict};
use crate::unicode;

#[derive(Debug, Clone, Default)]
pub struct Table {
    inner: PlainDict,
    key_map: OnceCell<HashMap<String, usize>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix cache: first-two-units -> max key length in units.
    fn key_map(&self) -> &HashMap<String, usize> {
        self.key_map.get_or_init(|| {
            let mut map: HashMap<String, usize> = HashMap::new();
            for (key, _) in self.inner.iter() {
                let units = unicode::split(&key);
                if units.len() >= 2 {
                    let prefix = units[..2].concat();
                    let entry = map.entry(prefix).or_insert(0);
                    *entry = (*entry).max(units.len());
                }
            }
            map
        })
    }
}

impl Dict for Table {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get(&self, key: &str) -> Option<&[String]> {
        self.inner.get(key)
    }

    fn add(&mut self, key: &str, values: &[String], skip_dedup: bool) {
        self.key_map.take();
        self.inner.add(key, values, skip_dedup);
    }

    fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.key_map.take();
        self.inner.remove(key)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (String, &[String])> + '_> {
        self.inner.iter()
    }

    fn match_at<'t>(
        &self,
        units: &'t [String],
        pos: usize,
        maxpos: usize,
    ) -> Option<DictMatch<'t, '_>> {
        let limit = maxpos.min(units.len());
        if pos >= limit {
            return None;
        }
        if pos + 2 <= limit {
            let prefix = units[pos..pos + 2].concat();
            if let Some(&max_len) = self.key_map().get(&prefix) {
                let mut len = max_len.min(limit - pos);
                while len >= 2 {
                    let key: String = units[pos..pos + len].concat();
                    if let Some(values) = self.inner.get(&key) {
                        if !values.is_empty() {
                            return Some(DictMatch {
                                units: &units[pos..pos + len],
                                values,
                                start: pos,
                                end: pos + len,
                            });
                        }
                    }
                    len -= 1;
                }
            }
        }
        let values = self.inner.get(&units[pos])?;
        if values.is_empty() {
            return None;
        }
        Some(DictMatch {
            units: &units[pos..pos + 1],
            values,
            start: pos,
            end: pos + 1,
        })
    }
}

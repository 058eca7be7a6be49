//! Hash-map backend with insertion-ordered iteration
//!
//! Matching probes key lengths downward from a global bound (the longest key
//! in the mapping, in units). Good enough for small mappings and the baseline
//! the other backends are checked against.

use std::collections::HashMap;

use once_cell::sync::OnceCell;

use super::{Dict, DictMatch};
use crate::unicode;

#[derive(Debug, Clone, Default)]
pub struct PlainDict {
    map: HashMap<String, Vec<String>>,
    order: Vec<String>,
    // longest key in units, computed on first match and dropped on mutation
    max_units: OnceCell<usize>,
}

impl PlainDict {
    pub fn new() -> Self {
        Self::default()
    }

    fn max_units(&self) -> usize {
        *self.max_units.get_or_init(|| {
            self.order
                .iter()
                .map(|key| unicode::split(key).len())
                .max()
                .unwrap_or(0)
        })
    }
}

impl Dict for PlainDict {
    fn len(&self) -> usize {
        self.order.len()
    }

    fn get(&self, key: &str) -> Option<&[String]> {
        self.map.get(key).map(Vec::as_slice)
    }

    fn add(&mut self, key: &str, values: &[String], skip_dedup: bool) {
        if !self.map.contains_key(key) {
            self.order.push(key.to_string());
            self.max_units.take();
        }
        let entry = self.map.entry(key.to_string()).or_default();
        for value in values {
            if skip_dedup || !entry.contains(value) {
                entry.push(value.clone());
            }
        }
    }

    fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        let removed = self.map.remove(key)?;
        self.order.retain(|k| k != key);
        self.max_units.take();
        Some(removed)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (String, &[String])> + '_> {
        Box::new(
            self.order
                .iter()
                .filter_map(|k| self.map.get(k).map(|v| (k.clone(), v.as_slice()))),
        )
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
        let mut len = self.max_units().min(limit - pos);
        while len >= 1 {
            let key: String = units[pos..pos + len].concat();
            if let Some(values) = self.map.get(&key) {
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
        None
    }
}

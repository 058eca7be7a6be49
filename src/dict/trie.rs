//! Prefix-tree backend
//!
//! Nodes live in an arena indexed by `usize`; no parent pointers and no
//! recursion. Each node remembers the order its edges appeared in, with the
//! empty string marking the terminal slot, so iteration (and the nested JSON
//! dump derived from it) is deterministic. A lookup walks at most one node
//! per unit, independent of how many keys the mapping holds.

use std::collections::HashMap;

use super::{Dict, DictMatch};
use crate::unicode;

#[derive(Debug, Clone, Default)]
struct Node {
    children: HashMap<String, usize>,
    // edge units in first-seen order; "" marks the terminal
    order: Vec<String>,
    values: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Vec<Node>,
    len: usize,
}

impl Default for Trie {
    fn default() -> Self {
        Trie {
            nodes: vec![Node::default()],
            len: 0,
        }
    }
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_at(&self, key: &str) -> Option<usize> {
        let mut idx = 0;
        for unit in unicode::split(key) {
            idx = self.nodes[idx].children.get(&unit).copied()?;
        }
        Some(idx)
    }
}

impl Dict for Trie {
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, key: &str) -> Option<&[String]> {
        self.nodes[self.node_at(key)?].values.as_deref()
    }

    fn add(&mut self, key: &str, values: &[String], skip_dedup: bool) {
        let mut idx = 0;
        for unit in unicode::split(key) {
            idx = match self.nodes[idx].children.get(&unit).copied() {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[idx].children.insert(unit.clone(), child);
                    self.nodes[idx].order.push(unit);
                    child
                }
            };
        }
        if self.nodes[idx].values.is_none() {
            self.nodes[idx].order.push(String::new());
            self.len += 1;
        }
        let entry = self.nodes[idx].values.get_or_insert_with(Vec::new);
        for value in values {
            if skip_dedup || !entry.contains(value) {
                entry.push(value.clone());
            }
        }
    }

    fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        // interior nodes are left in place; only the terminal is cleared
        let idx = self.node_at(key)?;
        let removed = self.nodes[idx].values.take()?;
        self.nodes[idx].order.retain(|unit| !unit.is_empty());
        self.len -= 1;
        Some(removed)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (String, &[String])> + '_> {
        Box::new(TrieIter {
            trie: self,
            stack: vec![(0, 0)],
            path: Vec::new(),
        })
    }

    fn match_at<'t>(
        &self,
        units: &'t [String],
        pos: usize,
        maxpos: usize,
    ) -> Option<DictMatch<'t, '_>> {
        let limit = maxpos.min(units.len());
        let mut idx = 0;
        let mut best: Option<(usize, &[String])> = None;
        let mut i = pos;
        while i < limit {
            match self.nodes[idx].children.get(&units[i]).copied() {
                Some(child) => {
                    idx = child;
                    i += 1;
                    if let Some(values) = &self.nodes[idx].values {
                        if !values.is_empty() {
                            best = Some((i, values.as_slice()));
                        }
                    }
                }
                None => break,
            }
        }
        best.map(|(end, values)| DictMatch {
            units: &units[pos..end],
            values,
            start: pos,
            end,
        })
    }
}

/// Depth-first walk over terminal nodes in edge-insertion order.
struct TrieIter<'a> {
    trie: &'a Trie,
    stack: Vec<(usize, usize)>,
    path: Vec<&'a str>,
}

impl<'a> Iterator for TrieIter<'a> {
    type Item = (String, &'a [String]);

    fn next(&mut self) -> Option<Self::Item> {
        let trie = self.trie;
        loop {
            let &(node_idx, slot) = self.stack.last()?;
            let node = &trie.nodes[node_idx];
            if slot >= node.order.len() {
                self.stack.pop();
                self.path.pop();
                continue;
            }
            if let Some(frame) = self.stack.last_mut() {
                frame.1 += 1;
            }
            let edge = &node.order[slot];
            if edge.is_empty() {
                if let Some(values) = &node.values {
                    return Some((self.path.concat(), values.as_slice()));
                }
                continue;
            }
            if let Some(&child) = node.children.get(edge.as_str()) {
                self.stack.push((child, 0));
                self.path.push(edge);
            }
        }
    }
}

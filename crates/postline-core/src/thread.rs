//! Thread compilation.
//!
//! A thread response is a forest of nested identifier lists in protocol
//! order (oldest first). [`ThreadAnchorMap::compile`] turns it into one
//! entry per thread, keyed by the thread's newest identifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::transport::ThreadNode;

/// Members of a compiled thread, excluding the anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadMembers {
    /// Single-message thread; the anchor maps to itself.
    Itself,
    /// The other members, ascending.
    Others(Vec<u32>),
}

impl ThreadMembers {
    /// Returns the other members, empty for a single-message thread.
    #[must_use]
    pub fn others(&self) -> &[u32] {
        match self {
            Self::Itself => &[],
            Self::Others(ids) => ids,
        }
    }
}

/// Ordered mapping from thread anchor to thread members.
///
/// Anchors are unique and sorted numerically descending, so the thread
/// that received the most recent message comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(u32, ThreadMembers)>", into = "Vec<(u32, ThreadMembers)>")]
pub struct ThreadAnchorMap {
    entries: Vec<(u32, ThreadMembers)>,
}

impl ThreadAnchorMap {
    /// Compiles a thread response.
    #[must_use]
    pub fn compile(threads: &[ThreadNode]) -> Self {
        let reversed = reverse_levels(threads);
        let mut map = BTreeMap::new();

        for node in &reversed {
            match node {
                ThreadNode::Id(id) => {
                    map.insert(*id, ThreadMembers::Itself);
                }
                ThreadNode::Branch(children) => {
                    let mut ids = Vec::new();
                    collect_ids(children, &mut ids);
                    ids.sort_unstable();
                    match ids.pop() {
                        Some(anchor) if ids.is_empty() => {
                            map.insert(anchor, ThreadMembers::Itself);
                        }
                        Some(anchor) => {
                            map.insert(anchor, ThreadMembers::Others(ids));
                        }
                        None => {}
                    }
                }
            }
        }

        Self {
            entries: map.into_iter().rev().collect(),
        }
    }

    /// Anchors in order.
    pub fn anchors(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|(anchor, _)| *anchor)
    }

    /// Entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &ThreadMembers)> {
        self.entries.iter().map(|(anchor, members)| (*anchor, members))
    }

    /// Members of the thread anchored at `anchor`.
    #[must_use]
    pub fn get(&self, anchor: u32) -> Option<&ThreadMembers> {
        self.entries
            .binary_search_by(|(a, _)| anchor.cmp(a))
            .ok()
            .map(|i| &self.entries[i].1)
    }

    /// Every identifier sharing a thread with `id`, excluding `id` itself.
    ///
    /// Works for anchors and non-anchor members alike. Returns `None` if
    /// `id` is not part of any multi-message thread.
    #[must_use]
    pub fn companions(&self, id: u32) -> Option<Vec<u32>> {
        if let Some(members) = self.get(id) {
            return match members {
                ThreadMembers::Itself => None,
                ThreadMembers::Others(ids) => Some(ids.clone()),
            };
        }
        self.entries.iter().find_map(|(anchor, members)| {
            let others = members.others();
            others.contains(&id).then(|| {
                let mut ids: Vec<u32> = others.iter().copied().filter(|m| *m != id).collect();
                ids.push(*anchor);
                ids
            })
        })
    }

    /// Number of threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there is no thread.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<(u32, ThreadMembers)>> for ThreadAnchorMap {
    fn from(entries: Vec<(u32, ThreadMembers)>) -> Self {
        let map: BTreeMap<_, _> = entries.into_iter().collect();
        Self {
            entries: map.into_iter().rev().collect(),
        }
    }
}

impl From<ThreadAnchorMap> for Vec<(u32, ThreadMembers)> {
    fn from(map: ThreadAnchorMap) -> Self {
        map.entries
    }
}

fn reverse_levels(nodes: &[ThreadNode]) -> Vec<ThreadNode> {
    nodes
        .iter()
        .rev()
        .map(|node| match node {
            ThreadNode::Id(id) => ThreadNode::Id(*id),
            ThreadNode::Branch(children) => ThreadNode::Branch(reverse_levels(children)),
        })
        .collect()
}

fn collect_ids(nodes: &[ThreadNode], out: &mut Vec<u32>) {
    for node in nodes {
        match node {
            ThreadNode::Id(id) => out.push(*id),
            ThreadNode::Branch(children) => collect_ids(children, out),
        }
    }
}

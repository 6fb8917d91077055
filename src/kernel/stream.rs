use std::collections::HashSet;
use std::fmt;

use super::natural::Natural;

/// An index into a StreamArena.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StreamId(usize);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "stream{}", self.0)
    }
}

#[derive(Clone, Copy, Debug)]
struct StreamNode {
    head: Natural,
    tail: StreamId,
}

/// Storage for coinductive streams.
///
/// A stream is a node with a head value and a tail, where the tail is another node in the same
/// arena. A tail may point back at the node itself or at an earlier node, so a periodic
/// infinite sequence takes finite space. Every node has a tail, so every stream is productive.
#[derive(Clone, Debug, Default)]
pub struct StreamArena {
    nodes: Vec<StreamNode>,
}

impl StreamArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The stream `value, value, value, ...`, as a node that is its own tail.
    pub fn constant(&mut self, value: Natural) -> StreamId {
        let id = StreamId(self.nodes.len());
        self.nodes.push(StreamNode {
            head: value,
            tail: id,
        });
        id
    }

    /// Prepends a head onto an existing stream.
    pub fn cons(&mut self, head: Natural, tail: StreamId) -> StreamId {
        let id = StreamId(self.nodes.len());
        self.nodes.push(StreamNode { head, tail });
        id
    }

    /// The stream `prefix..., cycle..., cycle..., ...`.
    /// Returns None if the cycle is empty, since that would not be productive.
    pub fn eventually_periodic(&mut self, prefix: &[Natural], cycle: &[Natural]) -> Option<StreamId> {
        let (&last, rest) = cycle.split_last()?;

        // Build the cycle back to front. The last node temporarily points at itself and is
        // patched to point at the first node of the cycle afterwards.
        let last_id = self.constant(last);
        let mut first = last_id;
        for &value in rest.iter().rev() {
            first = self.cons(value, first);
        }
        self.nodes[last_id.0].tail = first;

        let mut head = first;
        for &value in prefix.iter().rev() {
            head = self.cons(value, head);
        }
        Some(head)
    }

    pub fn head(&self, id: StreamId) -> Natural {
        self.nodes[id.0].head
    }

    pub fn tail(&self, id: StreamId) -> StreamId {
        self.nodes[id.0].tail
    }

    /// Observes the stream lazily. The iterator never ends.
    pub fn unfold(&self, id: StreamId) -> Unfold<'_> {
        Unfold {
            arena: self,
            current: id,
        }
    }

    pub fn take(&self, id: StreamId, n: usize) -> Vec<Natural> {
        self.unfold(id).take(n).collect()
    }

    /// Coinductive equality: two streams are bisimilar if their heads agree and their tails are
    /// bisimilar. Since the arena is finite, exploring pairs of nodes until we revisit one decides
    /// this exactly.
    pub fn bisimilar(&self, a: StreamId, b: StreamId) -> bool {
        let mut visited = HashSet::new();
        let mut pending = vec![(a, b)];
        while let Some((x, y)) = pending.pop() {
            if !visited.insert((x, y)) {
                continue;
            }
            if self.head(x) != self.head(y) {
                return false;
            }
            pending.push((self.tail(x), self.tail(y)));
        }
        true
    }
}

/// Lazy iteration over a stream's heads.
pub struct Unfold<'a> {
    arena: &'a StreamArena,
    current: StreamId,
}

impl Iterator for Unfold<'_> {
    type Item = Natural;

    fn next(&mut self) -> Option<Natural> {
        let head = self.arena.head(self.current);
        self.current = self.arena.tail(self.current);
        Some(head)
    }
}

//! Handle alias classes
//!
//! Disjoint sets over `HandleId` with path compression and union by rank.
//! Two handles in one class are may-aliases: a single abstract state is
//! kept for the whole class, stored under the class root.
//!
//! Each root also remembers the smallest member id so a class has a stable
//! name independent of union order (used when comparing loop iterations).

use crate::features::typestate::domain::HandleId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnionFind {
    /// Parent pointers (self-loop = root)
    parent: Vec<u32>,

    rank: Vec<u8>,

    /// Smallest member of each class (only valid for roots)
    min_member: Vec<u32>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids known to the structure
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Ensure `id` exists (as a singleton if new)
    pub fn make_set(&mut self, id: HandleId) {
        let idx = id.index();
        let old_len = self.parent.len();
        if idx >= old_len {
            self.parent.extend(old_len as u32..=idx as u32);
            self.rank.resize(idx + 1, 0);
            self.min_member.extend(old_len as u32..=idx as u32);
        }
    }

    /// Whether `id` has been added
    pub fn contains(&self, id: HandleId) -> bool {
        id.index() < self.parent.len()
    }

    /// Class root of `id` with path compression
    pub fn find(&mut self, id: HandleId) -> HandleId {
        self.make_set(id);
        let mut root = id.0;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut current = id.0;
        while self.parent[current as usize] != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }
        HandleId(root)
    }

    /// Class root without compression; unknown ids are their own root
    pub fn find_readonly(&self, id: HandleId) -> HandleId {
        if !self.contains(id) {
            return id;
        }
        let mut current = id.0;
        while self.parent[current as usize] != current {
            current = self.parent[current as usize];
        }
        HandleId(current)
    }

    /// Merge the classes of `a` and `b`, returning the new root
    pub fn union(&mut self, a: HandleId, b: HandleId) -> HandleId {
        let ra = self.find(a).index();
        let rb = self.find(b).index();
        if ra == rb {
            return HandleId(ra as u32);
        }

        let (root, child) = if self.rank[ra] < self.rank[rb] {
            (rb, ra)
        } else {
            if self.rank[ra] == self.rank[rb] {
                self.rank[ra] += 1;
            }
            (ra, rb)
        };
        self.parent[child] = root as u32;
        self.min_member[root] = self.min_member[root].min(self.min_member[child]);
        HandleId(root as u32)
    }

    pub fn connected(&mut self, a: HandleId, b: HandleId) -> bool {
        self.find(a) == self.find(b)
    }

    /// Stable class name: the smallest id in the class
    pub fn canonical(&self, id: HandleId) -> HandleId {
        let root = self.find_readonly(id);
        match self.min_member.get(root.index()) {
            Some(min) => HandleId(*min),
            None => id,
        }
    }

    /// All (member, root) pairs, for merging classes from another path
    pub fn pairs(&self) -> impl Iterator<Item = (HandleId, HandleId)> + '_ {
        (0..self.parent.len() as u32).map(move |i| (HandleId(i), self.find_readonly(HandleId(i))))
    }
}

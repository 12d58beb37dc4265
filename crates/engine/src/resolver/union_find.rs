use std::collections::HashMap;
use std::hash::Hash;

/// Disjoint-set over an arbitrary hashable key, generic over the element
/// type so it can be driven directly off raw company-name strings rather
/// than an index into a separate lookup table. Path compression on
/// `find`, union by rank on `union`.
pub struct UnionFind<T: Eq + Hash + Clone> {
    parent: HashMap<T, T>,
    rank: HashMap<T, u32>,
}

impl<T: Eq + Hash + Clone> UnionFind<T> {
    pub fn new() -> Self {
        Self { parent: HashMap::new(), rank: HashMap::new() }
    }

    pub fn insert(&mut self, x: &T) {
        self.ensure(x);
    }

    fn ensure(&mut self, x: &T) {
        if !self.parent.contains_key(x) {
            self.parent.insert(x.clone(), x.clone());
            self.rank.insert(x.clone(), 0);
        }
    }

    pub fn find(&mut self, x: &T) -> T {
        self.ensure(x);
        let parent = self.parent.get(x).expect("ensured above").clone();
        if &parent == x {
            return parent;
        }
        let root = self.find(&parent);
        self.parent.insert(x.clone(), root.clone());
        root
    }

    pub fn union(&mut self, a: &T, b: &T) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }

        let rank_a = *self.rank.get(&root_a).expect("root has rank");
        let rank_b = *self.rank.get(&root_b).expect("root has rank");

        if rank_a < rank_b {
            self.parent.insert(root_a, root_b);
        } else if rank_a > rank_b {
            self.parent.insert(root_b, root_a);
        } else {
            self.parent.insert(root_b, root_a.clone());
            self.rank.insert(root_a, rank_a + 1);
        }
    }

    /// Every inserted element, grouped by its cluster root.
    pub fn clusters(&mut self) -> HashMap<T, Vec<T>> {
        let members: Vec<T> = self.parent.keys().cloned().collect();
        let mut out: HashMap<T, Vec<T>> = HashMap::new();
        for member in members {
            let root = self.find(&member);
            out.entry(root).or_default().push(member);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unioned_elements_share_a_root() {
        let mut uf: UnionFind<String> = UnionFind::new();
        for name in ["a", "b", "c", "d"] {
            uf.insert(&name.to_string());
        }
        uf.union(&"a".to_string(), &"b".to_string());
        uf.union(&"b".to_string(), &"c".to_string());

        assert_eq!(uf.find(&"a".to_string()), uf.find(&"c".to_string()));
        assert_ne!(uf.find(&"a".to_string()), uf.find(&"d".to_string()));
    }

    #[test]
    fn clusters_group_every_inserted_element() {
        let mut uf: UnionFind<i32> = UnionFind::new();
        for n in 0..5 {
            uf.insert(&n);
        }
        uf.union(&0, &1);
        uf.union(&2, &3);

        let clusters = uf.clusters();
        let total: usize = clusters.values().map(|v| v.len()).sum();
        assert_eq!(total, 5);
        assert_eq!(clusters.len(), 3);
    }
}

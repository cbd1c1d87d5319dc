//! Dynamic bounding-box tree.
//!
//! Leaves hold one object each; internal nodes hold the union of their two
//! children. Insertion descends by the surface-area heuristic, so query cost
//! follows local density instead of total object count.

use std::collections::HashMap;

use crate::scene::ObjectId;

use super::aabb::Aabb;

const NULL: usize = usize::MAX;

#[derive(Debug, Clone)]
struct Node {
    aabb: Aabb,
    parent: usize,
    left: usize,
    right: usize,
    height: u32,
    key: Option<ObjectId>,
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.left == NULL
    }
}

#[derive(Debug)]
pub struct AabbTree {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: usize,
    leaves: HashMap<ObjectId, usize>,
}

impl Default for AabbTree {
    fn default() -> Self {
        Self::new()
    }
}

impl AabbTree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NULL,
            leaves: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.leaves.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Aabb> {
        self.leaves.get(id).map(|&leaf| self.nodes[leaf].aabb)
    }

    pub fn height(&self) -> u32 {
        if self.root == NULL {
            0
        } else {
            self.nodes[self.root].height
        }
    }

    /// Inserts `id`, replacing any previous entry for it.
    pub fn insert(&mut self, id: ObjectId, aabb: Aabb) {
        if let Some(&leaf) = self.leaves.get(&id) {
            if self.nodes[leaf].aabb == aabb {
                return;
            }
            self.remove_leaf(leaf);
            self.nodes[leaf].aabb = aabb;
            self.insert_leaf(leaf);
            return;
        }

        let leaf = self.allocate(Node {
            aabb,
            parent: NULL,
            left: NULL,
            right: NULL,
            height: 0,
            key: Some(id.clone()),
        });
        self.leaves.insert(id, leaf);
        self.insert_leaf(leaf);
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let Some(leaf) = self.leaves.remove(id) else {
            return false;
        };
        self.remove_leaf(leaf);
        self.release(leaf);
        true
    }

    /// Ids whose boxes strictly overlap `aabb`.
    pub fn query(&self, aabb: &Aabb) -> Vec<ObjectId> {
        let mut found = Vec::new();
        if self.root == NULL {
            return found;
        }
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !node.aabb.overlaps(aabb) {
                continue;
            }
            if node.is_leaf() {
                if let Some(key) = &node.key {
                    found.push(key.clone());
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
        found
    }

    fn allocate(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, index: usize) {
        let node = &mut self.nodes[index];
        node.key = None;
        node.parent = NULL;
        node.left = NULL;
        node.right = NULL;
        self.free.push(index);
    }

    fn insert_leaf(&mut self, leaf: usize) {
        if self.root == NULL {
            self.root = leaf;
            self.nodes[leaf].parent = NULL;
            return;
        }

        let leaf_box = self.nodes[leaf].aabb;
        let mut index = self.root;
        while !self.nodes[index].is_leaf() {
            let node = &self.nodes[index];
            let area = node.aabb.perimeter();
            let combined = node.aabb.union(&leaf_box).perimeter();

            // Cost of pairing the leaf with this node right here, versus the
            // minimum cost of pushing it down into either child.
            let cost = 2.0 * combined;
            let inheritance = 2.0 * (combined - area);
            let cost_left = self.descend_cost(node.left, &leaf_box) + inheritance;
            let cost_right = self.descend_cost(node.right, &leaf_box) + inheritance;

            if cost < cost_left && cost < cost_right {
                break;
            }
            index = if cost_left < cost_right {
                node.left
            } else {
                node.right
            };
        }

        let sibling = index;
        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.allocate(Node {
            aabb: self.nodes[sibling].aabb.union(&leaf_box),
            parent: old_parent,
            left: sibling,
            right: leaf,
            height: self.nodes[sibling].height + 1,
            key: None,
        });

        if old_parent == NULL {
            self.root = new_parent;
        } else if self.nodes[old_parent].left == sibling {
            self.nodes[old_parent].left = new_parent;
        } else {
            self.nodes[old_parent].right = new_parent;
        }
        self.nodes[sibling].parent = new_parent;
        self.nodes[leaf].parent = new_parent;

        self.refit(old_parent);
    }

    fn descend_cost(&self, child: usize, leaf_box: &Aabb) -> f64 {
        let node = &self.nodes[child];
        let union = node.aabb.union(leaf_box).perimeter();
        if node.is_leaf() {
            union
        } else {
            union - node.aabb.perimeter()
        }
    }

    fn remove_leaf(&mut self, leaf: usize) {
        if leaf == self.root {
            self.root = NULL;
            return;
        }

        let parent = self.nodes[leaf].parent;
        let grandparent = self.nodes[parent].parent;
        let sibling = if self.nodes[parent].left == leaf {
            self.nodes[parent].right
        } else {
            self.nodes[parent].left
        };

        if grandparent == NULL {
            self.root = sibling;
            self.nodes[sibling].parent = NULL;
        } else {
            if self.nodes[grandparent].left == parent {
                self.nodes[grandparent].left = sibling;
            } else {
                self.nodes[grandparent].right = sibling;
            }
            self.nodes[sibling].parent = grandparent;
        }
        self.release(parent);
        self.nodes[leaf].parent = NULL;
        self.refit(grandparent);
    }

    /// Recomputes boxes and heights from `index` up to the root.
    fn refit(&mut self, mut index: usize) {
        while index != NULL {
            let (left, right) = (self.nodes[index].left, self.nodes[index].right);
            let aabb = self.nodes[left].aabb.union(&self.nodes[right].aabb);
            let height = 1 + self.nodes[left].height.max(self.nodes[right].height);
            let node = &mut self.nodes[index];
            node.aabb = aabb;
            node.height = height;
            index = node.parent;
        }
    }

    /// Structural check used by tests: parent links agree and every internal
    /// box contains its children.
    #[cfg(test)]
    pub(crate) fn validate(&self) -> bool {
        if self.root == NULL {
            return self.leaves.is_empty();
        }
        let mut leaves = 0;
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                leaves += 1;
                continue;
            }
            for child in [node.left, node.right] {
                if self.nodes[child].parent != index
                    || !node.aabb.contains(&self.nodes[child].aabb)
                {
                    return false;
                }
                stack.push(child);
            }
        }
        leaves == self.leaves.len()
    }
}

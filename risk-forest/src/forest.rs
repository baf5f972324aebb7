use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub(crate) split_with: u32,
    pub(crate) split_at: f32,
    pub(crate) left: u32,
    pub(crate) right: u32,
}

impl Branch {
    pub fn split_with(&self) -> u32 {
        self.split_with
    }

    pub fn split_at(&self) -> f32 {
        self.split_at
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Branch | split_with: {}, split_at: {}, left: {}, right: {}",
            self.split_with, self.split_at, self.left, self.right
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub(crate) prediction: u32,
}

impl Leaf {
    pub fn prediction(&self) -> u32 {
        self.prediction
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf(Leaf),
    Branch(Branch),
}

impl Node {
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Calculate by how much we need to offset a branch's left and right
    /// pointers, given that the trees are getting disjoined from their root,
    /// which is stored at the front of the forest.
    fn offset(self, tree_sizes: &[usize], tree_index: usize) -> Result<Self, Error> {
        // The offset is the sum of the size of all preceding trees, up to the current
        // one, plus the total number of trees in the forest (to make space for all root
        // nodes to be in front)
        let offset =
            tree_sizes[..tree_index].iter().sum::<usize>() + tree_sizes.len() - (tree_index + 1);
        let offset: u32 = offset
            .try_into()
            .map_err(|_| Error::MalformedForest("node offset overflow"))?;

        if let Node::Branch(mut branch) = self {
            branch.left += offset;
            branch.right += offset;
            Ok(Node::Branch(branch))
        } else {
            Ok(self)
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Leaf(leaf) => write!(f, "Leaf   | prediction: {}", leaf.prediction),
            Node::Branch(b) => write!(f, "{b}"),
        }
    }
}

/// An array-backed random forest classifier.
///
/// The root of every tree is stored at the front of `nodes`, at the tree's
/// index, and every branch only ever points further down the array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    num_trees: usize,
    num_features: usize,
    classes: Vec<String>,
    nodes: Vec<Node>,
}

impl Forest {
    /// Join individually grown trees into a single flat [`Forest`].
    ///
    /// Every tree must have its root at index 0 and child pointers relative to
    /// the start of that tree.
    pub(crate) fn from_trees(
        trees: Vec<Vec<Node>>,
        num_features: usize,
        classes: Vec<String>,
    ) -> Result<Self, Error> {
        if trees.iter().any(|t| t.is_empty()) {
            return Err(Error::MalformedForest("empty tree"));
        }

        let tree_sizes = trees.iter().map(|t| t.len()).collect::<Vec<_>>();
        let mut nodes = Vec::with_capacity(tree_sizes.iter().sum());

        // Start by adding the root of each tree to the beginning of the array
        for (i, tree) in trees.iter().enumerate() {
            nodes.push(tree[0].clone().offset(&tree_sizes, i)?);
        }

        // Then add the rest of the nodes
        for (i, tree) in trees.into_iter().enumerate() {
            for node in tree.into_iter().skip(1) {
                nodes.push(node.offset(&tree_sizes, i)?);
            }
        }

        let forest = Self {
            num_trees: tree_sizes.len(),
            num_features,
            classes,
            nodes,
        };
        forest.validate()?;

        Ok(forest)
    }

    /// Check the structural invariants a deserialized forest must uphold
    /// before it can be traversed.
    pub fn validate(&self) -> Result<(), Error> {
        if self.num_trees == 0 || self.num_trees > self.nodes.len() {
            return Err(Error::MalformedForest("tree count does not fit node array"));
        }
        if self.classes.is_empty() {
            return Err(Error::MalformedForest("forest has no classes"));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            let i: u32 = i
                .try_into()
                .map_err(|_| Error::MalformedForest("node index overflow"))?;

            match node {
                Node::Branch(b) => {
                    // Ensure that every node only ever branches to another node further down
                    // the vec
                    if b.left <= i || b.right <= i {
                        return Err(Error::MalformedForest("branch points backwards"));
                    }
                    if b.left as usize >= self.nodes.len() || b.right as usize >= self.nodes.len()
                    {
                        return Err(Error::MalformedForest("branch points past the end"));
                    }
                    if b.split_with as usize >= self.num_features {
                        return Err(Error::MalformedForest("split on unknown feature"));
                    }
                }
                Node::Leaf(l) => {
                    if l.prediction as usize >= self.classes.len() {
                        return Err(Error::MalformedForest("leaf predicts unknown class"));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Class labels, indexed by the class ids stored in the leaves
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn class_label(&self, class: u32) -> Option<&str> {
        self.classes.get(class as usize).map(String::as_str)
    }

    fn next_left(&self, branch: &Branch) -> &Node {
        &self.nodes[branch.left as usize]
    }

    fn next_right(&self, branch: &Branch) -> &Node {
        &self.nodes[branch.right as usize]
    }

    fn tree_prediction(&self, tree_id: usize, features: &[f32]) -> u32 {
        // The tree root is stored at the tree index
        let mut node = &self.nodes[tree_id];

        loop {
            match node {
                Node::Branch(b) => {
                    // NaN compares false and therefore always descends right
                    if features[b.split_with as usize] <= b.split_at {
                        node = self.next_left(b)
                    } else {
                        node = self.next_right(b)
                    }
                }
                Node::Leaf(l) => break l.prediction,
            }
        }
    }

    /// Count the number of trees voting for each class
    pub fn votes(&self, features: &[f32]) -> Result<Vec<u32>, Error> {
        if features.len() != self.num_features {
            return Err(Error::FeatureCountMismatch {
                expected: self.num_features,
                found: features.len(),
            });
        }

        let mut votes = vec![0; self.classes.len()];
        for tree_id in 0..self.num_trees {
            votes[self.tree_prediction(tree_id, features) as usize] += 1;
        }

        Ok(votes)
    }

    /// Make a prediction based on input values (features). Ties go to the
    /// lowest class id.
    pub fn predict(&self, features: &[f32]) -> Result<u32, Error> {
        let votes = self.votes(features)?;

        let mut best = 0;
        for (class, &count) in votes.iter().enumerate() {
            if count > votes[best] {
                best = class;
            }
        }

        Ok(best as u32)
    }
}

impl fmt::Display for Forest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let branches = self.nodes.iter().filter(|n| n.is_branch()).count();
        writeln!(
            f,
            "Classification Forest: {} trees, size {} ({} branches, {} leaves), {} features, {} classes\n------------",
            self.num_trees,
            self.nodes.len(),
            branches,
            self.nodes.len() - branches,
            self.num_features,
            self.classes.len(),
        )?;

        writeln!(f, "Classes: ")?;
        for (i, class) in self.classes.iter().enumerate() {
            writeln!(f, "\t{i}: {class}")?;
        }

        writeln!(f, "------------")?;

        Ok(())
    }
}

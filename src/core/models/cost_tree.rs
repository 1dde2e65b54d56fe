use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::formatter::Granularity;

/// One node of a cost breakdown payload: either a leaf amount or a keyed branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CostNode {
    Value(f64),
    Branch(BTreeMap<String, CostNode>),
}

impl CostNode {
    pub fn as_branch(&self) -> Option<&BTreeMap<String, CostNode>> {
        match self {
            Self::Branch(map) => Some(map),
            Self::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Branch(_) => None,
        }
    }
}

/// Cost breakdown as returned by the backend:
/// dimension -> category -> granularity -> bucket -> amount.
///
/// Top-level granularity keys (`"day"`, `"month"`, ...) hold ungrouped totals
/// directly as bucket -> amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostTree {
    pub root: BTreeMap<String, CostNode>,
}

impl CostTree {
    pub fn get(&self, key: &str) -> Option<&CostNode> {
        self.root.get(key)
    }

    /// Categories grouped under `dimension`, if the dimension is present and branched.
    pub fn dimension(&self, dimension: &str) -> Option<&BTreeMap<String, CostNode>> {
        self.root.get(dimension).and_then(CostNode::as_branch)
    }

    /// Ungrouped bucket totals for a granularity (`tree["day"]`).
    pub fn granularity_total(&self, granularity: Granularity) -> Option<&CostNode> {
        self.root.get(granularity.key())
    }

    /// Replace category keys of `dimension` using `rename`. Categories for which
    /// `rename` returns `None` keep their key. Colliding names are merged.
    pub fn rekey_dimension<F>(&mut self, dimension: &str, rename: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(CostNode::Branch(categories)) = self.root.remove(dimension) else {
            return;
        };
        let mut renamed: BTreeMap<String, CostNode> = BTreeMap::new();
        for (key, node) in categories {
            let new_key = rename(&key).unwrap_or(key);
            match renamed.remove(&new_key) {
                Some(existing) => {
                    renamed.insert(new_key, merge(existing, node));
                }
                None => {
                    renamed.insert(new_key, node);
                }
            }
        }
        self.root
            .insert(dimension.to_string(), CostNode::Branch(renamed));
    }
}

fn merge(a: CostNode, b: CostNode) -> CostNode {
    match (a, b) {
        (CostNode::Value(x), CostNode::Value(y)) => CostNode::Value(x + y),
        (CostNode::Branch(mut x), CostNode::Branch(y)) => {
            for (key, node) in y {
                let merged = match x.remove(&key) {
                    Some(existing) => merge(existing, node),
                    None => node,
                };
                x.insert(key, merged);
            }
            CostNode::Branch(x)
        }
        // Shape mismatch: keep the first node, the transform reports it as malformed.
        (a, _) => a,
    }
}

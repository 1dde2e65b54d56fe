use std::collections::{BTreeMap, BTreeSet};

use crate::core::formatter::Granularity;
use crate::core::models::cost_tree::{CostNode, CostTree};
use crate::core::models::series::Series;
use crate::core::transform::{category_label, EmptyReason, Shaped, ALL_DIMENSION, TOTAL_KEY};

/// Build one series per category of `dimension`, all sharing the same sorted
/// set of buckets. Buckets a category lacks are filled with 0.
///
/// `dimension == "all"` selects the ungrouped totals (`tree[granularity]`) as a
/// single `"Total"` series when present.
pub fn to_bar_series(tree: &CostTree, dimension: &str, granularity: Granularity) -> Shaped<Series> {
    if dimension == ALL_DIMENSION {
        if let Some(node) = tree.granularity_total(granularity) {
            return match bucket_values(node, granularity.key()) {
                Ok(buckets) => Shaped::Ready(vec![Series {
                    key: TOTAL_KEY.to_string(),
                    values: buckets.into_iter().map(|(k, v)| (k.clone(), v)).collect(),
                }]),
                Err(reason) => Shaped::Empty(reason),
            };
        }
    }

    let Some(node) = tree.get(dimension) else {
        return Shaped::Empty(EmptyReason::MissingDimension(dimension.to_string()));
    };
    let Some(categories) = node.as_branch() else {
        return Shaped::Empty(EmptyReason::Malformed {
            path: dimension.to_string(),
        });
    };
    if categories.is_empty() {
        return Shaped::Empty(EmptyReason::NoCategories);
    }

    let mut per_category: Vec<(&String, BTreeMap<&String, f64>)> =
        Vec::with_capacity(categories.len());
    let mut all_buckets: BTreeSet<&String> = BTreeSet::new();

    for (category, node) in categories {
        let path = format!("{}.{}", dimension, category);
        let Some(sub) = node.as_branch() else {
            return Shaped::Empty(EmptyReason::Malformed { path });
        };
        let Some(buckets) = sub.get(granularity.key()) else {
            return Shaped::Empty(EmptyReason::MissingGranularity {
                dimension: dimension.to_string(),
                granularity: granularity.key().to_string(),
            });
        };
        let buckets = match bucket_values(buckets, &format!("{}.{}", path, granularity)) {
            Ok(b) => b,
            Err(reason) => return Shaped::Empty(reason),
        };
        all_buckets.extend(buckets.keys().copied());
        per_category.push((category, buckets));
    }

    let series = per_category
        .into_iter()
        .map(|(category, buckets)| Series {
            key: category_label(dimension, category),
            values: all_buckets
                .iter()
                .map(|bucket| ((*bucket).clone(), buckets.get(bucket).copied().unwrap_or(0.0)))
                .collect(),
        })
        .collect();

    Shaped::Ready(series)
}

/// Read a bucket -> amount branch, sorted by bucket key.
fn bucket_values<'a>(node: &'a CostNode, path: &str) -> Result<BTreeMap<&'a String, f64>, EmptyReason> {
    let branch = node.as_branch().ok_or_else(|| EmptyReason::Malformed {
        path: path.to_string(),
    })?;
    branch
        .iter()
        .map(|(bucket, value)| {
            value
                .as_value()
                .map(|v| (bucket, v))
                .ok_or_else(|| EmptyReason::Malformed {
                    path: format!("{}.{}", path, bucket),
                })
        })
        .collect()
}

use crate::core::models::cost_tree::CostTree;
use crate::core::models::series::{PieSlice, Series};
use crate::core::transform::{category_label, EmptyReason, Shaped};

/// One slice per category of `dimension`. Categories must already be totals.
pub fn to_pie_slices(tree: &CostTree, dimension: &str) -> Shaped<PieSlice> {
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

    let mut slices = Vec::with_capacity(categories.len());
    for (category, node) in categories {
        let Some(value) = node.as_value() else {
            return Shaped::Empty(EmptyReason::Malformed {
                path: format!("{}.{}", dimension, category),
            });
        };
        slices.push(PieSlice {
            key: category_label(dimension, category),
            value,
        });
    }
    Shaped::Ready(slices)
}

/// Collapse bar series into per-category totals.
pub fn pie_from_series(series: &[Series]) -> Vec<PieSlice> {
    series
        .iter()
        .map(|s| PieSlice {
            key: s.key.clone(),
            value: s.total(),
        })
        .collect()
}

pub fn to_total(slices: &[PieSlice]) -> f64 {
    slices.iter().map(|s| s.value).sum()
}

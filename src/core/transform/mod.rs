//! Reshapes backend cost payloads into chart- and table-ready structures.
//!
//! Every function here is pure. Shape mismatches never panic: they yield
//! [`Shaped::Empty`] with the reason, which callers may render as "no data".

pub mod bar;
pub mod differentiator;
pub mod pie;

pub use bar::to_bar_series;
pub use differentiator::to_differentiator_table;
pub use pie::{pie_from_series, to_pie_slices, to_total};

/// Pseudo-dimension selecting the ungrouped totals.
pub const ALL_DIMENSION: &str = "all";

/// Key of the single series / row carrying ungrouped totals.
pub const TOTAL_KEY: &str = "Total";

#[derive(Debug, Clone, PartialEq)]
pub enum EmptyReason {
    MissingDimension(String),
    MissingGranularity {
        dimension: String,
        granularity: String,
    },
    Malformed {
        path: String,
    },
    NoCategories,
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDimension(d) => write!(f, "no data grouped by '{}'", d),
            Self::MissingGranularity {
                dimension,
                granularity,
            } => write!(f, "'{}' has no '{}' buckets", dimension, granularity),
            Self::Malformed { path } => write!(f, "unexpected payload shape at '{}'", path),
            Self::NoCategories => write!(f, "no categories"),
        }
    }
}

/// Result of a transform: the items, or why there are none.
#[derive(Debug, Clone, PartialEq)]
pub enum Shaped<T> {
    Ready(Vec<T>),
    Empty(EmptyReason),
}

impl<T> Shaped<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Self::Ready(items) => items,
            Self::Empty(_) => &[],
        }
    }

    pub fn reason(&self) -> Option<&EmptyReason> {
        match self {
            Self::Ready(_) => None,
            Self::Empty(reason) => Some(reason),
        }
    }

    /// Degrade to a plain vector, logging why it is empty.
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Ready(items) => items,
            Self::Empty(reason) => {
                tracing::debug!(%reason, "transform produced no data");
                Vec::new()
            }
        }
    }
}

/// Display key for a category; the backend uses "" for untagged costs.
pub fn category_label(dimension: &str, key: &str) -> String {
    if key.is_empty() {
        format!("No {}", dimension)
    } else {
        key.to_string()
    }
}

use crate::core::models::series::{
    DifferentiatorRow, DifferentiatorTable, EntityHistory, VariationCell,
};
use crate::core::transform::TOTAL_KEY;

/// Costs below a cent on both sides of a comparison report no variation.
const NEGLIGIBLE_COST: f64 = 0.01;

fn negligible(cost: f64) -> bool {
    cost.abs() < NEGLIGIBLE_COST
}

/// Build the period-over-period table: one row per entity in input order, plus
/// a synthetic `"Total"` row. `dates` is the union of entry dates in the order
/// they are first seen.
pub fn to_differentiator_table(entities: &[EntityHistory]) -> DifferentiatorTable {
    let mut dates: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(entities.len());

    for entity in entities {
        let mut row = DifferentiatorRow::new(entity.id.clone());
        let mut previous_cost: Option<f64> = None;

        for entry in &entity.entries {
            if !dates.contains(&entry.date) {
                dates.push(entry.date.clone());
            }
            let variation = match previous_cost {
                None => 0.0,
                Some(prev) if negligible(prev) && negligible(entry.cost) => 0.0,
                Some(_) => entry.percent_variation,
            };
            row.cells.insert(
                entry.date.clone(),
                VariationCell {
                    cost: entry.cost,
                    variation,
                },
            );
            previous_cost = Some(entry.cost);
        }
        rows.push(row);
    }

    let total = total_row(&dates, &rows);
    DifferentiatorTable { dates, rows, total }
}

fn total_row(dates: &[String], rows: &[DifferentiatorRow]) -> DifferentiatorRow {
    let mut total = DifferentiatorRow::new(TOTAL_KEY);
    let mut previous: Option<f64> = None;

    for date in dates {
        let cost: f64 = rows
            .iter()
            .filter_map(|row| row.cell(date))
            .map(|cell| cell.cost)
            .sum();
        let variation = match previous {
            Some(prev) if prev != 0.0 => (cost - prev) / prev * 100.0,
            _ => 0.0,
        };
        total
            .cells
            .insert(date.clone(), VariationCell { cost, variation });
        previous = Some(cost);
    }
    total
}

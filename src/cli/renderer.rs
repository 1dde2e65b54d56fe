use colored::{control, ColoredString, Colorize};

use crate::core::formatter::{
    bucket_label, format_bytes, format_cost, format_share_bar, format_variation, Granularity,
};
use crate::core::models::resources::{Account, BucketStat, InstanceReport};
use crate::core::models::series::{DifferentiatorTable, PieSlice, Series, VariationCell};
use crate::core::state::Interval;
use crate::core::transform::{to_total, EmptyReason};

const BAR_WIDTH: usize = 12;
const KEY_WIDTH: usize = 24;

fn header(title: &str, interval: Option<&Interval>) -> String {
    let text = match interval {
        Some(i) => format!(
            " {} ({}, {} to {})",
            title, i.granularity, i.begin, i.end
        ),
        None => format!(" {}", title),
    };
    text.bold().to_string()
}

fn truncate(key: &str) -> String {
    if key.chars().count() > KEY_WIDTH {
        let cut: String = key.chars().take(KEY_WIDTH - 1).collect();
        format!("{}…", cut)
    } else {
        key.to_string()
    }
}

/// Inline warning shown in place of a widget whose fetch failed.
pub fn render_warning(title: &str, message: &str, use_color: bool) -> String {
    control::set_override(use_color);
    format!("{}\n  {}", header(title, None), format!("! {}", message).yellow())
}

pub fn render_empty(title: &str, reason: &EmptyReason, use_color: bool) -> String {
    control::set_override(use_color);
    format!(
        "{}\n  {}",
        header(title, None),
        format!("No data: {}", reason).dimmed()
    )
}

/// Render bar series as one line per category, busiest first.
///
/// ```text
///  Costs by product (day, 2024-01-01 to 2024-01-31)
///   EC2                      $1,204.10 [████████░░░░]
///   S3                         $310.00 [██░░░░░░░░░░]
///   Total                    $1,514.10
/// ```
///
/// `detailed` adds one line per bucket under each category.
pub fn render_series(
    title: &str,
    series: &[Series],
    interval: Option<&Interval>,
    detailed: bool,
    use_color: bool,
) -> String {
    control::set_override(use_color);

    let mut lines = vec![header(title, interval)];
    let granularity = interval.map(|i| i.granularity).unwrap_or(Granularity::Day);

    let mut ordered: Vec<&Series> = series.iter().collect();
    ordered.sort_by(|a, b| b.total().total_cmp(&a.total()));
    let total: f64 = ordered.iter().map(|s| s.total()).sum();

    for s in ordered {
        let amount = s.total();
        lines.push(format!(
            "  {:<width$} {:>12} {}",
            truncate(&s.key).cyan(),
            format_cost(amount),
            format_share_bar(amount, total, BAR_WIDTH).magenta(),
            width = KEY_WIDTH
        ));
        if detailed {
            for (bucket, value) in &s.values {
                lines.push(format!(
                    "    {:<width$} {:>12}",
                    bucket_label(granularity, bucket).dimmed(),
                    format_cost(*value),
                    width = KEY_WIDTH - 2
                ));
            }
        }
    }
    lines.push(format!(
        "  {:<width$} {:>12}",
        "Total".bold(),
        format_cost(total),
        width = KEY_WIDTH
    ));
    lines.join("\n")
}

pub fn render_pie(title: &str, slices: &[PieSlice], use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines = vec![header(title, None)];
    let total = to_total(slices);
    let mut ordered: Vec<&PieSlice> = slices.iter().collect();
    ordered.sort_by(|a, b| b.value.total_cmp(&a.value));

    for slice in ordered {
        let share = if total > 0.0 {
            slice.value / total * 100.0
        } else {
            0.0
        };
        lines.push(format!(
            "  {:<width$} {:>12} {:>6.1}% {}",
            truncate(&slice.key).cyan(),
            format_cost(slice.value),
            share,
            format_share_bar(slice.value, total, BAR_WIDTH).magenta(),
            width = KEY_WIDTH
        ));
    }
    lines.push(format!(
        "  {:<width$} {:>12}",
        "Total".bold(),
        format_cost(total),
        width = KEY_WIDTH
    ));
    lines.join("\n")
}

fn colored_variation(cell: &VariationCell) -> ColoredString {
    let text = format_variation(cell.variation);
    if cell.variation > 0.0 {
        text.red()
    } else if cell.variation < 0.0 {
        text.green()
    } else {
        text.dimmed()
    }
}

/// One block per date: every entity's cost and variation, then the total.
pub fn render_differentiator(
    table: &DifferentiatorTable,
    interval: Option<&Interval>,
    use_color: bool,
) -> String {
    control::set_override(use_color);

    let mut lines = vec![header("Cost variation", interval)];
    let granularity = interval.map(|i| i.granularity).unwrap_or(Granularity::Month);

    for date in &table.dates {
        lines.push(format!("  {}", bucket_label(granularity, date).bold()));
        for row in table.rows.iter().chain(std::iter::once(&table.total)) {
            let Some(cell) = row.cell(date) else {
                continue;
            };
            let key = if row.key == table.total.key {
                truncate(&row.key).bold()
            } else {
                truncate(&row.key).cyan()
            };
            lines.push(format!(
                "    {:<width$} {:>12} {:>8}",
                key,
                format_cost(cell.cost),
                colored_variation(cell),
                width = KEY_WIDTH
            ));
        }
    }
    if table.dates.is_empty() {
        lines.push(format!("  {}", "No data".dimmed()));
    }
    lines.join("\n")
}

pub fn render_accounts(accounts: &[Account], selected: &[String], use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines = vec![header("Accounts", None)];
    for account in accounts {
        let marker = if selected.contains(&account.id) { "*" } else { " " };
        lines.push(format!(
            "  {} {:<width$} {} {}",
            marker.green(),
            truncate(account.display_name()).cyan(),
            account.id,
            account
                .provider
                .as_deref()
                .map(|p| format!("({})", p))
                .unwrap_or_default()
                .dimmed(),
            width = KEY_WIDTH
        ));
    }
    if accounts.is_empty() {
        lines.push(format!("  {}", "No accounts".dimmed()));
    }
    lines.join("\n")
}

pub fn render_buckets(buckets: &[BucketStat], use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines = vec![header("S3 buckets", None)];
    for bucket in buckets {
        lines.push(format!(
            "  {:<width$} {:>10} {:>10} objects {:>12} {}",
            truncate(&bucket.name).cyan(),
            format_bytes(bucket.size_bytes),
            bucket.objects,
            format_cost(bucket.cost),
            bucket.region.as_deref().unwrap_or("").dimmed(),
            width = KEY_WIDTH
        ));
    }
    if buckets.is_empty() {
        lines.push(format!("  {}", "No buckets".dimmed()));
    }
    lines.join("\n")
}

pub fn render_instances(
    instances: &[InstanceReport],
    interval: Option<&Interval>,
    use_color: bool,
) -> String {
    control::set_override(use_color);

    let mut lines = vec![header("Instances", interval)];
    for instance in instances {
        let cpu = instance
            .cpu_average
            .map(|c| format!("{:.1}% cpu", c))
            .unwrap_or_else(|| "- cpu".to_string());
        let cpu = match instance.cpu_average {
            Some(c) if c < 5.0 => cpu.yellow(),
            _ => cpu.normal(),
        };
        lines.push(format!(
            "  {:<width$} {:<12} {:>10} {:>12} {}",
            truncate(&instance.id).cyan(),
            instance.kind.as_deref().unwrap_or("-"),
            cpu,
            format_cost(instance.cost),
            instance.region.as_deref().unwrap_or("").dimmed(),
            width = KEY_WIDTH
        ));
    }
    if instances.is_empty() {
        lines.push(format!("  {}", "No instances".dimmed()));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::series::{EntityHistory, VariationEntry};
    use crate::core::transform::to_differentiator_table;
    use chrono::NaiveDate;

    fn series(key: &str, values: &[(&str, f64)]) -> Series {
        Series {
            key: key.into(),
            values: values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn interval() -> Interval {
        Interval {
            begin: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            granularity: Granularity::Day,
        }
    }

    #[test]
    fn series_sorted_by_total_with_grand_total() {
        let data = vec![
            series("S3", &[("2024-01-01", 1.0)]),
            series("EC2", &[("2024-01-01", 10.0)]),
        ];
        let output = render_series("Costs by product", &data, Some(&interval()), false, false);
        let ec2 = output.find("EC2").unwrap();
        let s3 = output.find("S3").unwrap();
        assert!(ec2 < s3);
        assert!(output.contains("$11.00"));
        assert!(output.contains("2024-01-01 to 2024-01-31"));
    }

    #[test]
    fn detailed_series_lists_buckets() {
        let data = vec![series("EC2", &[("2024-01-05", 2.5)])];
        let output = render_series("Costs", &data, Some(&interval()), true, false);
        assert!(output.contains("Jan 05"));
        assert!(output.contains("$2.50"));
    }

    #[test]
    fn pie_shows_shares() {
        let slices = vec![
            PieSlice { key: "eu".into(), value: 25.0 },
            PieSlice { key: "us".into(), value: 75.0 },
        ];
        let output = render_pie("Costs by region", &slices, false);
        assert!(output.contains("75.0%"));
        assert!(output.contains("25.0%"));
        assert!(output.contains("$100.00"));
    }

    #[test]
    fn differentiator_lists_total_per_date() {
        let table = to_differentiator_table(&[EntityHistory {
            id: "EC2".into(),
            entries: vec![
                VariationEntry { date: "2024-01".into(), cost: 10.0, percent_variation: 0.0 },
                VariationEntry { date: "2024-02".into(), cost: 15.0, percent_variation: 50.0 },
            ],
        }]);
        let output = render_differentiator(&table, None, false);
        assert!(output.contains("Jan 2024"));
        assert!(output.contains("Feb 2024"));
        assert!(output.contains("+50.0%"));
        assert_eq!(output.matches("Total").count(), 2);
    }

    #[test]
    fn accounts_mark_selection() {
        let accounts = vec![
            Account { id: "111".into(), name: Some("prod".into()), provider: Some("aws".into()) },
            Account { id: "222".into(), name: None, provider: None },
        ];
        let output = render_accounts(&accounts, &["111".to_string()], false);
        assert!(output.contains("* prod"));
        assert!(output.contains("(aws)"));
        assert!(output.contains("222"));
    }

    #[test]
    fn warning_contains_message() {
        let output = render_warning("S3 buckets", "Error with request", false);
        assert!(output.contains("! Error with request"));
    }

    #[test]
    fn long_keys_are_truncated() {
        let long = "a".repeat(40);
        assert_eq!(truncate(&long).chars().count(), KEY_WIDTH);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn render_no_ansi_when_color_false() {
        let buckets = vec![BucketStat {
            name: "logs".into(),
            region: Some("eu-west-1".into()),
            size_bytes: 2048,
            objects: 3,
            cost: 1.0,
        }];
        let output = render_buckets(&buckets, false);
        assert!(output.contains("2.0 KB"));
        assert!(!output.contains('\x1b'), "output should not contain ANSI codes");
    }
}

// 📊 Spending summary - display aggregates over the current records
//
// Pure functions of (records, today); nothing here touches the store.

use crate::expense::Expense;
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpendingSummary {
    pub today_total: f64,
    pub yesterday_total: f64,
    /// Monday-start week containing `today`.
    pub week_total: f64,
    pub month_total: f64,
    pub expense_count: usize,
}

impl SpendingSummary {
    pub fn compute(expenses: &[Expense], today: NaiveDate) -> Self {
        let yesterday = today.pred_opt();
        let this_week = week_start(today);

        let mut summary = SpendingSummary {
            expense_count: expenses.len(),
            ..Default::default()
        };

        for expense in expenses {
            let day = expense.day();

            if day == today {
                summary.today_total += expense.amount;
            }
            if Some(day) == yesterday {
                summary.yesterday_total += expense.amount;
            }
            if week_start(day) == this_week {
                summary.week_total += expense.amount;
            }
            if day.year() == today.year() && day.month() == today.month() {
                summary.month_total += expense.amount;
            }
        }

        summary
    }

    /// Change from yesterday to today in percent; 0 when yesterday is 0.
    pub fn percent_change(&self) -> f64 {
        if self.yesterday_total == 0.0 {
            return 0.0;
        }
        (self.today_total - self.yesterday_total) / self.yesterday_total * 100.0
    }

    /// "12% from yesterday" style trend text, `None` without a yesterday total.
    pub fn trend_label(&self) -> Option<String> {
        if self.yesterday_total <= 0.0 {
            return None;
        }
        let change = self.percent_change();
        let label = if change > 0.0 {
            format!("↑ {:.0}% from yesterday", change.abs())
        } else if change < 0.0 {
            format!("↓ {:.0}% from yesterday", change.abs())
        } else {
            "Same as yesterday".to_string()
        };
        Some(label)
    }
}

fn week_start(day: NaiveDate) -> NaiveDate {
    let offset = u64::from(day.weekday().num_days_from_monday());
    day.checked_sub_days(Days::new(offset)).unwrap_or(day)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// Per-category sums in order of first appearance, rounded to cents.
pub fn category_totals(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();

    for expense in expenses {
        match totals.iter_mut().find(|t| t.category == expense.category) {
            Some(entry) => entry.total += expense.amount,
            None => totals.push(CategoryTotal {
                category: expense.category.clone(),
                total: expense.amount,
            }),
        }
    }

    for entry in &mut totals {
        entry.total = round_cents(entry.total);
    }

    totals
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::{midnight_utc, seed_expenses};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn on(id: &str, amount: f64, category: &str, date: NaiveDate) -> Expense {
        Expense::new(id, amount, "Something", category, midnight_utc(date))
    }

    #[test]
    fn test_seed_summary_on_seed_day() {
        // 2024-04-25 is a Thursday
        let summary = SpendingSummary::compute(&seed_expenses(), day(2024, 4, 25));

        assert_eq!(summary.today_total, 45.99);
        assert_eq!(summary.yesterday_total, 10.5);
        // Mon 22 .. Thu 25; Sunday 21 belongs to the previous week
        assert_eq!(round_cents(summary.week_total), 205.24);
        assert_eq!(round_cents(summary.month_total), 270.54);
        assert_eq!(summary.expense_count, 5);
    }

    #[test]
    fn test_month_requires_same_year() {
        let expenses = vec![
            on("a", 10.0, "Food", day(2023, 5, 3)),
            on("b", 5.0, "Food", day(2024, 5, 3)),
        ];

        let summary = SpendingSummary::compute(&expenses, day(2024, 5, 20));
        assert_eq!(summary.month_total, 5.0);
        assert_eq!(summary.today_total, 0.0);
    }

    #[test]
    fn test_week_spans_month_boundary() {
        // Wed 2024-05-01; week starts Mon 2024-04-29
        let expenses = vec![
            on("a", 1.0, "Food", day(2024, 4, 28)),
            on("b", 2.0, "Food", day(2024, 4, 29)),
            on("c", 4.0, "Food", day(2024, 5, 1)),
        ];

        let summary = SpendingSummary::compute(&expenses, day(2024, 5, 1));
        assert_eq!(summary.week_total, 6.0);
        assert_eq!(summary.month_total, 4.0);
    }

    #[test]
    fn test_percent_change_and_trend() {
        let mut summary = SpendingSummary::default();
        assert_eq!(summary.percent_change(), 0.0);
        assert_eq!(summary.trend_label(), None);

        summary.yesterday_total = 20.0;
        summary.today_total = 30.0;
        assert_eq!(summary.percent_change(), 50.0);
        assert_eq!(summary.trend_label().as_deref(), Some("↑ 50% from yesterday"));

        summary.today_total = 15.0;
        assert_eq!(summary.trend_label().as_deref(), Some("↓ 25% from yesterday"));

        summary.today_total = 20.0;
        assert_eq!(summary.trend_label().as_deref(), Some("Same as yesterday"));
    }

    #[test]
    fn test_category_totals_in_first_appearance_order() {
        let expenses = vec![
            on("a", 0.1, "Shopping", day(2024, 1, 1)),
            on("b", 2.0, "Food", day(2024, 1, 2)),
            on("c", 0.2, "Shopping", day(2024, 1, 3)),
        ];

        let totals = category_totals(&expenses);

        assert_eq!(
            totals,
            vec![
                CategoryTotal { category: "Shopping".to_string(), total: 0.3 },
                CategoryTotal { category: "Food".to_string(), total: 2.0 },
            ]
        );
        assert!(category_totals(&[]).is_empty());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(12.5), "$12.50");
        assert_eq!(format_amount(0.0), "$0.00");
        assert_eq!(format_amount(-3.456), "-$3.46");
    }
}

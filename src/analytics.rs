//! Aggregates over a user's transactions: the dashboard overview and the
//! downloadable reports.
//!
//! Everything here works on rows already loaded from the database, so the
//! route handlers only have to fetch and hand over.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::transaction::{Transaction, TransactionType};

pub const UNKNOWN_CATEGORY: &str = "Unknown category";
pub const UNKNOWN_BUDGET: &str = "Unknown budget";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Quarter,
    #[default]
    Year,
}

impl Period {
    /// Whether `at` falls in this period of `year`, as seen from `now`.
    pub fn contains(self, at: NaiveDateTime, year: i32, now: NaiveDateTime) -> bool {
        if at.year() != year {
            return false;
        }
        match self {
            Period::Week => at >= now - Duration::days(7),
            Period::Month => at.month() == now.month(),
            Period::Quarter => at.month0() / 3 == now.month0() / 3,
            Period::Year => true,
        }
    }
}

/// Id to display name lookups for categories and budgets.
#[derive(Debug, Default)]
pub struct Names {
    pub categories: HashMap<i64, String>,
    pub budgets: HashMap<i64, String>,
}

impl Names {
    pub fn category(&self, id: i64) -> &str {
        self.categories.get(&id).map_or(UNKNOWN_CATEGORY, String::as_str)
    }

    pub fn budget(&self, id: i64) -> &str {
        self.budgets.get(&id).map_or(UNKNOWN_BUDGET, String::as_str)
    }
}

// ---- overview ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotals {
    pub month: String,
    pub income: Decimal,
    pub expenses: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedValue {
    pub name: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub name: String,
    pub income: Decimal,
    pub expenses: Decimal,
    pub transactions: i64,
}

#[derive(Debug, Serialize)]
pub struct Overview {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_balance: Decimal,
    pub transactions: usize,
    pub monthly: Vec<MonthTotals>,
    pub expenses_by_category: Vec<NamedValue>,
    pub by_budget: Vec<Breakdown>,
}

fn totals<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> (Decimal, Decimal) {
    transactions
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(income, expenses), t| {
            match t.transaction_type {
                TransactionType::Income => (income + t.amount, expenses),
                TransactionType::Expense => (income, expenses + t.amount),
            }
        })
}

pub fn overview(
    transactions: &[Transaction],
    names: &Names,
    period: Period,
    year: i32,
    now: NaiveDateTime,
) -> Overview {
    let selected: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| period.contains(t.created_at, year, now))
        .collect();

    let (total_income, total_expenses) = totals(selected.iter().copied());

    let mut monthly: Vec<MonthTotals> = Vec::new();
    for t in &selected {
        let key = t.created_at.format("%Y-%m").to_string();
        let index = match monthly.iter().position(|m| m.month == key) {
            Some(index) => index,
            None => {
                monthly.push(MonthTotals {
                    month: key,
                    income: Decimal::ZERO,
                    expenses: Decimal::ZERO,
                });
                monthly.len() - 1
            }
        };
        let row = &mut monthly[index];
        match t.transaction_type {
            TransactionType::Income => row.income += t.amount,
            TransactionType::Expense => row.expenses += t.amount,
        }
    }
    monthly.sort_by(|a, b| a.month.cmp(&b.month));

    let mut by_category: Vec<NamedValue> = Vec::new();
    for t in selected
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Expense)
    {
        let name = names.category(t.category_id);
        match by_category.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.value += t.amount,
            None => by_category.push(NamedValue {
                name: name.to_string(),
                value: t.amount,
            }),
        }
    }
    by_category.sort_by(|a, b| b.value.cmp(&a.value));

    let by_budget = breakdown(selected.iter().copied(), |t| names.budget(t.budget_id));

    Overview {
        total_income,
        total_expenses,
        net_balance: total_income - total_expenses,
        transactions: selected.len(),
        monthly,
        expenses_by_category: by_category,
        by_budget,
    }
}

/// Groups by display name; rows keep first-seen order.
fn breakdown<'a, 'n, F>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    name_of: F,
) -> Vec<Breakdown>
where
    F: Fn(&Transaction) -> &'n str,
{
    let mut rows: Vec<Breakdown> = Vec::new();
    for t in transactions {
        let name = name_of(t);
        let index = match rows.iter().position(|row| row.name == name) {
            Some(index) => index,
            None => {
                rows.push(Breakdown {
                    name: name.to_string(),
                    income: Decimal::ZERO,
                    expenses: Decimal::ZERO,
                    transactions: 0,
                });
                rows.len() - 1
            }
        };
        let row = &mut rows[index];
        match t.transaction_type {
            TransactionType::Income => row.income += t.amount,
            TransactionType::Expense => row.expenses += t.amount,
        }
        row.transactions += 1;
    }
    rows
}

// ---- reports ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    Summary,
    Categories,
    Budgets,
    Detailed,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub kind: ReportKind,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportQuery {
    /// Inclusive `[from 00:00, to 23:59:59.999]` window.
    pub fn range(&self) -> ApiResult<(NaiveDateTime, NaiveDateTime)> {
        let (Some(from), Some(to)) = (self.from, self.to) else {
            return Err(ApiError::BadRequest(
                "Both 'from' and 'to' dates are required".to_string(),
            ));
        };
        if to < from {
            return Err(ApiError::BadRequest(
                "'to' date must not be before 'from' date".to_string(),
            ));
        }
        let start = from.and_hms_opt(0, 0, 0);
        let end = to.and_hms_milli_opt(23, 59, 59, 999);
        match (start, end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(ApiError::BadRequest("Invalid report dates".to_string())),
        }
    }

    pub fn period_label(&self) -> String {
        match (self.from, self.to) {
            (Some(from), Some(to)) => format!("{from} - {to}"),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub period: String,
    pub total_transactions: usize,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_balance: Decimal,
    pub income_transactions: usize,
    pub expense_transactions: usize,
    pub average_transaction: Decimal,
    pub largest_income: Decimal,
    pub largest_expense: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedRow {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category_name: String,
    pub budget_name: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Summary(Summary),
    Rows(Vec<Breakdown>),
    Detailed(Vec<DetailedRow>),
}

pub fn build_report(
    kind: ReportKind,
    period: String,
    transactions: &[Transaction],
    names: &Names,
) -> Report {
    match kind {
        ReportKind::Summary => Report::Summary(summary(period, transactions)),
        ReportKind::Categories => {
            Report::Rows(ranked(breakdown(transactions, |t| names.category(t.category_id))))
        }
        ReportKind::Budgets => {
            Report::Rows(ranked(breakdown(transactions, |t| names.budget(t.budget_id))))
        }
        ReportKind::Detailed => Report::Detailed(detailed(transactions, names)),
    }
}

fn summary(period: String, transactions: &[Transaction]) -> Summary {
    let (total_income, total_expenses) = totals(transactions);
    let largest = |kind: TransactionType| {
        transactions
            .iter()
            .filter(|t| t.transaction_type == kind)
            .map(|t| t.amount)
            .max()
            .unwrap_or(Decimal::ZERO)
    };
    let income_transactions = transactions
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Income)
        .count();

    let average_transaction = if transactions.is_empty() {
        Decimal::ZERO
    } else {
        ((total_income + total_expenses) / Decimal::from(transactions.len())).round_dp(2)
    };

    Summary {
        period,
        total_transactions: transactions.len(),
        total_income,
        total_expenses,
        net_balance: total_income - total_expenses,
        income_transactions,
        expense_transactions: transactions.len() - income_transactions,
        average_transaction,
        largest_income: largest(TransactionType::Income),
        largest_expense: largest(TransactionType::Expense),
    }
}

fn ranked(mut rows: Vec<Breakdown>) -> Vec<Breakdown> {
    rows.sort_by(|a, b| (b.income + b.expenses).cmp(&(a.income + a.expenses)));
    rows
}

fn detailed(transactions: &[Transaction], names: &Names) -> Vec<DetailedRow> {
    let mut rows: Vec<DetailedRow> = transactions
        .iter()
        .map(|t| DetailedRow {
            transaction: t.clone(),
            category_name: names.category(t.category_id).to_string(),
            budget_name: names.budget(t.budget_id).to_string(),
        })
        .collect();
    rows.sort_by(|a, b| b.transaction.created_at.cmp(&a.transaction.created_at));
    rows
}

// ---- CSV ----

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Always-quoted field with embedded quotes doubled.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Quotes a user-supplied field only when it would break the row.
fn field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quoted(value)
    } else {
        value.to_string()
    }
}

/// Renders a report as CSV, starting with a UTF-8 byte order mark so
/// spreadsheet apps pick the right encoding for Cyrillic names.
pub fn to_csv(report: &Report) -> String {
    let mut out = String::from('\u{FEFF}');

    match report {
        Report::Summary(s) => {
            out.push_str("Metric,Value\n");
            out.push_str(&format!("Period,{}\n", field(&s.period)));
            out.push_str(&format!("Total transactions,{}\n", s.total_transactions));
            out.push_str(&format!("Total income,{}\n", money(s.total_income)));
            out.push_str(&format!("Total expenses,{}\n", money(s.total_expenses)));
            out.push_str(&format!("Net balance,{}\n", money(s.net_balance)));
            out.push_str(&format!("Income transactions,{}\n", s.income_transactions));
            out.push_str(&format!("Expense transactions,{}\n", s.expense_transactions));
            out.push_str(&format!("Average transaction,{}\n", money(s.average_transaction)));
            out.push_str(&format!("Largest income,{}\n", money(s.largest_income)));
            out.push_str(&format!("Largest expense,{}\n", money(s.largest_expense)));
        }
        Report::Rows(rows) => {
            out.push_str("Name,Income,Expenses,Transactions,Total\n");
            for row in rows {
                out.push_str(&format!(
                    "{},{},{},{},{}\n",
                    field(&row.name),
                    money(row.income),
                    money(row.expenses),
                    row.transactions,
                    money(row.income + row.expenses)
                ));
            }
        }
        Report::Detailed(rows) => {
            out.push_str("Date,Type,Amount,Description,Category,Budget\n");
            for row in rows {
                let t = &row.transaction;
                let description = t
                    .description
                    .as_deref()
                    .map(|d| d.replace(',', ";"))
                    .unwrap_or_else(|| "-".to_string());
                let kind = match t.transaction_type {
                    TransactionType::Income => "Income",
                    TransactionType::Expense => "Expense",
                };
                out.push_str(&format!(
                    "{},{},{},{},{},{}\n",
                    t.created_at.format("%d.%m.%Y"),
                    kind,
                    money(t.amount),
                    quoted(&description),
                    field(&row.category_name),
                    field(&row.budget_name)
                ));
            }
        }
    }

    out
}

pub fn csv_filename(kind: ReportKind, query: &ReportQuery) -> String {
    let kind = match kind {
        ReportKind::Summary => "summary",
        ReportKind::Categories => "categories",
        ReportKind::Budgets => "budgets",
        ReportKind::Detailed => "detailed",
    };
    match (query.from, query.to) {
        (Some(from), Some(to)) => format!("{kind}_report_{from}_{to}.csv"),
        _ => format!("{kind}_report.csv"),
    }
}

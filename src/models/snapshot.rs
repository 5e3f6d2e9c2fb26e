use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExpenseRecord, RepairRecord, SaleRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Sales,
    Repairs,
    Expenses,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Collection::Sales => "sales",
            Collection::Repairs => "repairs",
            Collection::Expenses => "expenses",
        })
    }
}

/// A collection that could not be read and was replaced by an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub collection: Collection,
    pub message: String,
}

/// Records of a collection that could not be decoded and were left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecords {
    pub collection: Collection,
    pub count: usize,
}

/// Immutable bundle of source records read for a single report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub sales: Vec<SaleRecord>,
    pub repairs: Vec<RepairRecord>,
    pub expenses: Vec<ExpenseRecord>,
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub failures: Vec<SourceFailure>,
    #[serde(default)]
    pub skipped: Vec<SkippedRecords>,
}

impl SourceSnapshot {
    pub fn new(taken_at: DateTime<Utc>) -> Self {
        Self {
            sales: Vec::new(),
            repairs: Vec::new(),
            expenses: Vec::new(),
            taken_at,
            failures: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn with_sales(mut self, sales: Vec<SaleRecord>) -> Self {
        self.sales = sales;
        self
    }

    pub fn with_repairs(mut self, repairs: Vec<RepairRecord>) -> Self {
        self.repairs = repairs;
        self
    }

    pub fn with_expenses(mut self, expenses: Vec<ExpenseRecord>) -> Self {
        self.expenses = expenses;
        self
    }

    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty() || !self.skipped.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty() && self.repairs.is_empty() && self.expenses.is_empty()
    }
}

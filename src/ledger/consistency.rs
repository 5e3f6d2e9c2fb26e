//! Self-checks that grouped figures reconstruct the ungrouped ones.
//!
//! A failure here means the reporting logic is wrong, not that the source
//! data is dirty, so these errors are never downgraded to warnings.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::models::{EntryKind, Id, LedgerEntry};

use super::aggregate::{total, MonthlyPoint};
use super::kpi::KpiSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("partition by {partition} sums to {grouped}, but the ungrouped total is {total}")]
    PartitionMismatch {
        partition: String,
        grouped: Decimal,
        total: Decimal,
    },
    #[error("{kind} entry {id} has amount {amount} with the wrong sign")]
    SignViolation {
        id: Id,
        kind: EntryKind,
        amount: Decimal,
    },
    #[error("net profit {net_profit} does not match revenue {revenue} minus expenses {expenses} (signed total {signed_total})")]
    NetProfitMismatch {
        net_profit: Decimal,
        revenue: Decimal,
        expenses: Decimal,
        signed_total: Decimal,
    },
}

/// Largest absolute difference tolerated between two derivations of a total.
pub fn tolerance() -> Decimal {
    Decimal::new(1, 2)
}

pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    a.checked_sub(b)
        .is_some_and(|difference| difference.abs() <= tolerance())
}

fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Check that the values of `grouped` add up to the settled total of `entries`.
pub fn verify_partition<K>(
    partition: &str,
    entries: &[LedgerEntry],
    grouped: &BTreeMap<K, Decimal>,
) -> Result<(), ConsistencyError> {
    let grouped_sum = saturating_sum(grouped.values().copied());
    check(partition, grouped_sum, total(entries))
}

/// Same check for the monthly series, using each month's net.
pub fn verify_monthly_series(
    entries: &[LedgerEntry],
    series: &[MonthlyPoint],
) -> Result<(), ConsistencyError> {
    let grouped_sum = saturating_sum(series.iter().map(|p| p.net));
    check("month", grouped_sum, total(entries))
}

/// `net_profit` must equal both `revenue - expenses` and the signed sum of
/// settled entries.
pub fn verify_kpis(entries: &[LedgerEntry], kpis: &KpiSet) -> Result<(), ConsistencyError> {
    let signed_total = total(entries);
    let derived = kpis.total_revenue.saturating_sub(kpis.total_expenses);
    if !within_tolerance(kpis.net_profit, derived) || !within_tolerance(kpis.net_profit, signed_total)
    {
        return Err(ConsistencyError::NetProfitMismatch {
            net_profit: kpis.net_profit,
            revenue: kpis.total_revenue,
            expenses: kpis.total_expenses,
            signed_total,
        });
    }
    Ok(())
}

pub fn verify_signs(entries: &[LedgerEntry]) -> Result<(), ConsistencyError> {
    match entries.iter().find(|e| !e.has_valid_sign()) {
        Some(e) => Err(ConsistencyError::SignViolation {
            id: e.id.clone(),
            kind: e.kind,
            amount: e.amount,
        }),
        None => Ok(()),
    }
}

fn check(partition: &str, grouped: Decimal, total: Decimal) -> Result<(), ConsistencyError> {
    if within_tolerance(grouped, total) {
        Ok(())
    } else {
        Err(ConsistencyError::PartitionMismatch {
            partition: partition.to_string(),
            grouped,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entries() -> Vec<LedgerEntry> {
        let at = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        vec![
            LedgerEntry::revenue("s1", EntryKind::Sale, at, Decimal::from(100), true),
            LedgerEntry::expense("e1", at, Decimal::from(30), true, "Rent"),
        ]
    }

    #[test]
    fn partition_within_a_cent_passes() {
        let grouped = BTreeMap::from([("a", Decimal::new(7001, 2))]);
        assert!(verify_partition("test", &entries(), &grouped).is_ok());
    }

    #[test]
    fn extreme_values_compare_without_overflow() {
        assert!(!within_tolerance(Decimal::MAX, Decimal::MIN));
        let grouped = BTreeMap::from([("a", Decimal::MAX), ("b", Decimal::MAX)]);
        assert!(verify_partition("test", &entries(), &grouped).is_err());
    }

    #[test]
    fn partition_drift_is_reported() {
        let grouped = BTreeMap::from([("a", Decimal::from(100)), ("b", Decimal::from(-29))]);
        let err = verify_partition("category", &entries(), &grouped).unwrap_err();
        assert_eq!(
            err,
            ConsistencyError::PartitionMismatch {
                partition: "category".to_string(),
                grouped: Decimal::from(71),
                total: Decimal::from(70),
            }
        );
    }

    #[test]
    fn sign_violation_is_reported() {
        let mut bad = entries();
        bad[1].amount = Decimal::from(30);
        assert!(matches!(
            verify_signs(&bad),
            Err(ConsistencyError::SignViolation { .. })
        ));
        assert!(verify_signs(&entries()).is_ok());
    }
}

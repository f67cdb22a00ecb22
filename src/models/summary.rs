//! Derived values recomputed from the current collections on every render.

use super::{
    Amount, Case, CaseStatus, Event, EventStatus, PaymentStatus, Priority, Task, Transaction,
    TransactionKind,
};
use crate::storage::Store;
use serde::Serialize;

/// How many events the overview lists.
pub const UPCOMING_EVENT_LIMIT: usize = 5;

/// Signed sum of all transactions: income adds, expense subtracts.
pub fn balance(transactions: &[Transaction]) -> Amount {
    transactions.iter().map(Transaction::signed_amount).sum()
}

/// The `limit` events with the earliest date-times, ascending.
///
/// Past events are not excluded. Events without a date-time sort last.
pub fn upcoming_events(events: &[Event], limit: usize) -> Vec<&Event> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|e| (e.starts_at.is_none(), e.starts_at));
    sorted.truncate(limit);
    sorted
}

/// Cases whose client name equals `client` exactly, in store order.
pub fn cases_by_client<'a>(cases: &'a [Case], client: &str) -> Vec<(usize, &'a Case)> {
    cases
        .iter()
        .enumerate()
        .filter(|(_, case)| case.client == client)
        .collect()
}

/// Figures shown on the overview page.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub clients: usize,
    pub cases: usize,
    pub tasks: usize,
    pub balance: Amount,
    pub upcoming: Vec<Event>,
}

impl Overview {
    pub fn compute(store: &Store) -> Self {
        Self {
            clients: store.clients.len(),
            cases: store.cases.len(),
            tasks: store.tasks.len(),
            balance: balance(store.transactions.all()),
            upcoming: upcoming_events(store.events.all(), UPCOMING_EVENT_LIMIT)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

/// A labelled count in a report breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub key: &'static str,
    pub label: &'static str,
    pub count: usize,
}

/// Breakdowns for the reports page.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub cases_by_status: Vec<Tally>,
    pub tasks_by_priority: Vec<Tally>,
    pub events_by_status: Vec<Tally>,
    pub income: Amount,
    pub expenses: Amount,
    pub pending: Amount,
    pub balance: Amount,
}

impl Report {
    pub fn compute(store: &Store) -> Self {
        let cases = store.cases.all();
        let tasks: &[Task] = store.tasks.all();
        let events = store.events.all();
        let transactions = store.transactions.all();

        let cases_by_status = CaseStatus::ALL
            .iter()
            .map(|status| Tally {
                key: status.as_str(),
                label: status.label(),
                count: cases.iter().filter(|c| c.status == *status).count(),
            })
            .collect();
        let tasks_by_priority = Priority::ALL
            .iter()
            .map(|priority| Tally {
                key: priority.as_str(),
                label: priority.label(),
                count: tasks.iter().filter(|t| t.priority == *priority).count(),
            })
            .collect();
        let events_by_status = EventStatus::ALL
            .iter()
            .map(|status| Tally {
                key: status.as_str(),
                label: status.label(),
                count: events.iter().filter(|e| e.status == *status).count(),
            })
            .collect();

        let total_of = |kind: TransactionKind| -> Amount {
            transactions
                .iter()
                .filter(|t| t.kind == kind)
                .map(|t| t.amount)
                .sum()
        };
        let pending = transactions
            .iter()
            .filter(|t| t.payment == PaymentStatus::Pending)
            .map(Transaction::signed_amount)
            .sum();

        Self {
            cases_by_status,
            tasks_by_priority,
            events_by_status,
            income: total_of(TransactionKind::Income),
            expenses: total_of(TransactionKind::Expense),
            pending,
            balance: balance(transactions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn txn(kind: TransactionKind, cents: i64) -> Transaction {
        Transaction {
            kind,
            amount: Amount::from_cents(cents),
            ..Default::default()
        }
    }

    fn event_at(title: &str, day: u32) -> Event {
        Event {
            title: title.to_string(),
            starts_at: NaiveDate::from_ymd_opt(2024, 7, day).and_then(|d| d.and_hms_opt(9, 0, 0)),
            ..Default::default()
        }
    }

    #[test]
    fn test_balance_income_minus_expense() {
        let txns = vec![
            txn(TransactionKind::Income, 10_000),
            txn(TransactionKind::Expense, 4_000),
        ];
        assert_eq!(balance(&txns).to_string(), "60.00");
    }

    #[test]
    fn test_balance_empty_is_zero() {
        assert_eq!(balance(&[]).to_string(), "0.00");
    }

    #[test]
    fn test_balance_of_huge_amounts_saturates() {
        let txns = vec![
            txn(TransactionKind::Income, 9_000_000_000_000_000_000),
            txn(TransactionKind::Income, 9_000_000_000_000_000_000),
        ];
        assert_eq!(balance(&txns), Amount::from_cents(i64::MAX));
    }

    #[test]
    fn test_balance_can_go_negative() {
        let txns = vec![txn(TransactionKind::Expense, 2_550)];
        assert_eq!(balance(&txns).to_currency(), "R$ -25.50");
    }

    #[test]
    fn test_upcoming_events_sorted_and_limited() {
        let events: Vec<Event> = [12, 3, 28, 7, 1, 19, 5]
            .iter()
            .map(|d| event_at(&format!("e{}", d), *d))
            .collect();

        let titles: Vec<&str> = upcoming_events(&events, UPCOMING_EVENT_LIMIT)
            .iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(titles, vec!["e1", "e3", "e5", "e7", "e12"]);
    }

    #[test]
    fn test_upcoming_events_undated_last() {
        let events = vec![
            Event { title: "sem data".into(), ..Default::default() },
            event_at("datado", 2),
        ];
        let titles: Vec<&str> = upcoming_events(&events, 5).iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["datado", "sem data"]);
    }

    #[test]
    fn test_cases_by_client_exact_match() {
        let cases = vec![
            Case { client: "Ana".into(), process_number: "1".into(), ..Default::default() },
            Case { client: "Ana Maria".into(), process_number: "2".into(), ..Default::default() },
            Case { client: "Ana".into(), process_number: "3".into(), ..Default::default() },
        ];
        let hits: Vec<usize> = cases_by_client(&cases, "Ana").iter().map(|(i, _)| *i).collect();
        assert_eq!(hits, vec![0, 2]);
    }

    #[test]
    fn test_report_breakdowns() {
        let mut store = Store::new();
        store.cases.append(Case { status: CaseStatus::Closed, ..Default::default() });
        store.cases.append(Case::default());
        store.transactions.append(txn(TransactionKind::Income, 50_000));
        store.transactions.append(Transaction {
            payment: PaymentStatus::Paid,
            ..txn(TransactionKind::Expense, 12_000)
        });

        let report = Report::compute(&store);
        let open = report.cases_by_status.iter().find(|t| t.key == "open").unwrap();
        assert_eq!(open.count, 1);
        assert_eq!(report.income.to_string(), "500.00");
        assert_eq!(report.expenses.to_string(), "120.00");
        assert_eq!(report.pending.to_string(), "500.00");
        assert_eq!(report.balance.to_currency(), "R$ 380.00");
    }
}

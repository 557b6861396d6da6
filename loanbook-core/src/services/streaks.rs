//! Streak analyzer - consecutive missed-payment runs per client

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::domain::{Client, DaySummary, MissedStreak};

/// Paid and unpaid client ids of one day
struct DayIndex<'a> {
    paid: HashSet<&'a str>,
    unpaid: HashSet<&'a str>,
}

impl<'a> DayIndex<'a> {
    fn new(day: &'a DaySummary) -> Self {
        Self {
            paid: day.paid_clients.iter().map(|p| p.client_id.as_str()).collect(),
            unpaid: day.unpaid_clients.iter().map(|u| u.client_id.as_str()).collect(),
        }
    }
}

/// Current missed-payment streaks, longest first.
///
/// `days` must be oldest first, as produced by the aggregator. For each
/// active client the days are scanned from the most recent backward: an
/// unpaid day extends the streak, a paid day ends the scan, and a day on
/// which the client was not active is skipped. Clients without a streak
/// are omitted; ties are ordered by client id.
pub fn find_missed_streaks(clients: &[Client], days: &[DaySummary]) -> Vec<MissedStreak> {
    let newest_first: Vec<DayIndex> = days.iter().rev().map(DayIndex::new).collect();

    let mut streaks: Vec<MissedStreak> = clients
        .iter()
        .filter(|c| c.status.is_active())
        .filter_map(|client| streak_for(client, &newest_first))
        .collect();

    streaks.sort_by(|a, b| {
        b.streak_length
            .cmp(&a.streak_length)
            .then_with(|| a.client_id.cmp(&b.client_id))
    });
    streaks
}

fn streak_for(client: &Client, newest_first: &[DayIndex]) -> Option<MissedStreak> {
    let id = client.id.as_str();
    let mut streak_length = 0u32;
    let mut total_missed = Decimal::ZERO;

    for day in newest_first {
        if day.paid.contains(id) {
            break;
        }
        if day.unpaid.contains(id) {
            streak_length += 1;
            total_missed = total_missed.saturating_add(client.daily_payment);
        }
    }

    (streak_length > 0).then(|| MissedStreak {
        client_id: client.id.clone(),
        client_name: client.name.clone(),
        phone: client.phone.clone(),
        streak_length,
        total_missed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientStatus, PaidClient, UnpaidClient};
    use chrono::NaiveDate;

    fn client(id: &str, daily: i64) -> Client {
        Client::new(
            id,
            id.to_uppercase(),
            Decimal::new(150000, 0),
            Decimal::new(daily, 0),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    /// One day where `paid` clients paid their daily amount and `unpaid` did not
    fn day(d: u32, paid: &[&Client], unpaid: &[&Client]) -> DaySummary {
        DaySummary {
            date: NaiveDate::from_ymd_opt(2024, 6, d).unwrap(),
            paid_clients: paid
                .iter()
                .map(|c| PaidClient {
                    client_id: c.id.clone(),
                    client_name: c.name.clone(),
                    daily_payment: c.daily_payment,
                    actual_amount_paid: c.daily_payment,
                })
                .collect(),
            unpaid_clients: unpaid.iter().map(|c| UnpaidClient::from_client(c)).collect(),
            total_collected: paid.iter().map(|c| c.daily_payment).sum(),
            expected_total: Decimal::ZERO,
        }
    }

    #[test]
    fn test_recent_payment_means_no_streak() {
        let c = client("c1", 3000);
        let days = vec![day(8, &[], &[&c]), day(9, &[], &[&c]), day(10, &[&c], &[])];
        assert!(find_missed_streaks(&[c], &days).is_empty());
    }

    #[test]
    fn test_streak_stops_at_paid_day() {
        let c = client("c1", 3000);
        let days = vec![
            day(7, &[], &[&c]),
            day(8, &[&c], &[]),
            day(9, &[], &[&c]),
            day(10, &[], &[&c]),
        ];
        let streaks = find_missed_streaks(&[c], &days);
        assert_eq!(streaks.len(), 1);
        assert_eq!(streaks[0].streak_length, 2);
        assert_eq!(streaks[0].total_missed, Decimal::new(6000, 0));
    }

    #[test]
    fn test_inactive_days_neither_extend_nor_break() {
        let c = client("c1", 1000);
        let days = vec![
            day(7, &[&c], &[]),
            day(8, &[], &[&c]),
            day(9, &[], &[]),
            day(10, &[], &[&c]),
        ];
        let streaks = find_missed_streaks(&[c], &days);
        assert_eq!(streaks[0].streak_length, 2);
        assert_eq!(streaks[0].total_missed, Decimal::new(2000, 0));
    }

    #[test]
    fn test_sorted_by_length_then_id() {
        let a = client("a", 1000);
        let b = client("b", 1000);
        let c = client("c", 1000);
        let days = vec![
            day(8, &[&b], &[&a, &c]),
            day(9, &[], &[&a, &b, &c]),
            day(10, &[], &[&a, &b, &c]),
        ];
        let streaks = find_missed_streaks(&[c.clone(), b.clone(), a.clone()], &days);
        let order: Vec<_> = streaks.iter().map(|s| (s.client_id.as_str(), s.streak_length)).collect();
        assert_eq!(order, vec![("a", 3), ("c", 3), ("b", 2)]);
    }

    #[test]
    fn test_total_missed_saturates() {
        let mut c = client("c1", 0);
        c.daily_payment = Decimal::MAX;
        let days = vec![day(9, &[], &[&c]), day(10, &[], &[&c])];
        let streaks = find_missed_streaks(&[c], &days);
        assert_eq!(streaks[0].streak_length, 2);
        assert_eq!(streaks[0].total_missed, Decimal::MAX);
    }

    #[test]
    fn test_large_roster() {
        let clients: Vec<Client> = (0..3000).map(|i| client(&format!("c{:04}", i), 1000)).collect();
        let (payers, missers): (Vec<&Client>, Vec<&Client>) =
            clients.iter().partition(|c| c.id.ends_with('0'));
        let days: Vec<DaySummary> = (1..=30)
            .map(|d| {
                if d == 1 {
                    day(d, &clients.iter().collect::<Vec<_>>(), &[])
                } else {
                    day(d, &payers, &missers)
                }
            })
            .collect();

        let streaks = find_missed_streaks(&clients, &days);
        assert_eq!(streaks.len(), missers.len());
        assert!(streaks.iter().all(|s| s.streak_length == 29));
        assert_eq!(streaks[0].client_id, "c0001");
        assert_eq!(streaks[0].total_missed, Decimal::new(29000, 0));
    }

    #[test]
    fn test_non_active_clients_are_ignored() {
        let mut c = client("c1", 1000);
        let days = vec![day(10, &[], &[&c])];
        c.status = ClientStatus::Defaulted;
        assert!(find_missed_streaks(&[c], &days).is_empty());
    }
}

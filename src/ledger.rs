use chrono::NaiveDate;
use log::debug;
use std::collections::{HashMap, HashSet};

/// A measurement window with parsed bounds.
#[derive(Debug, Clone)]
pub struct WindowSpan {
    pub id: i64,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WindowSpan {
    /// Intersection of this window with [start, end], if any.
    pub fn intersect(&self, start: NaiveDate, end: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let overlap_start = self.start.max(start);
        let overlap_end = self.end.min(end);
        (overlap_start <= overlap_end).then_some((overlap_start, overlap_end))
    }
}

/// Workforce-wide simultaneous-vacation cap: max(1, round(n * percent / 100)).
pub fn max_simultaneous(employee_count: usize, percent: f64) -> u32 {
    let cap = (employee_count as f64 * percent / 100.0).round() as u32;
    cap.max(1)
}

/// Per-client cap: at most 10% of the client's workforce, floored, never zero.
pub fn client_cap(client_size: usize) -> u32 {
    let cap = (client_size as f64 * 0.1).floor() as u32;
    cap.max(1)
}

/// Per-request occupancy counters backing the greedy schedulers.
///
/// Tracks, per calendar day, how many employees are on vacation overall and
/// how many per client on days covered by a measurement window. A candidate
/// interval fits when committing it would not push any day past the global
/// cap nor any window-covered day past the owning client's cap.
pub struct OccupancyLedger {
    max_simultaneous: u32,
    client_caps: HashMap<String, u32>,
    daily: HashMap<NaiveDate, u32>,
    client_daily: HashMap<(String, NaiveDate), u32>,
    window_days: HashSet<NaiveDate>,
}

impl OccupancyLedger {
    pub fn new(
        max_simultaneous: u32,
        client_caps: HashMap<String, u32>,
        windows: &[WindowSpan],
    ) -> Self {
        let mut window_days = HashSet::new();
        for window in windows {
            let mut day = window.start;
            while day <= window.end {
                window_days.insert(day);
                day = day.succ_opt().unwrap();
            }
        }

        debug!(
            "Occupancy ledger: global cap {}, {} client caps, {} window days",
            max_simultaneous,
            client_caps.len(),
            window_days.len()
        );

        Self {
            max_simultaneous,
            client_caps,
            daily: HashMap::new(),
            client_daily: HashMap::new(),
            window_days,
        }
    }

    pub fn max_simultaneous(&self) -> u32 {
        self.max_simultaneous
    }

    fn cap_for(&self, client: &str) -> u32 {
        self.client_caps.get(client).copied().unwrap_or(1)
    }

    /// Whether [start, end] can be committed for an employee of `client`
    /// without breaching the global or per-client caps.
    pub fn fits(&self, start: NaiveDate, end: NaiveDate, client: &str) -> bool {
        let client_cap = self.cap_for(client);
        let mut day = start;
        while day <= end {
            let global = self.daily.get(&day).copied().unwrap_or(0);
            if global + 1 > self.max_simultaneous {
                return false;
            }
            if self.window_days.contains(&day) {
                let of_client = self
                    .client_daily
                    .get(&(client.to_string(), day))
                    .copied()
                    .unwrap_or(0);
                if of_client + 1 > client_cap {
                    return false;
                }
            }
            day = day.succ_opt().unwrap();
        }
        true
    }

    /// Record a committed vacation interval.
    pub fn commit(&mut self, start: NaiveDate, end: NaiveDate, client: &str) {
        let mut day = start;
        while day <= end {
            *self.daily.entry(day).or_insert(0) += 1;
            if self.window_days.contains(&day) {
                *self
                    .client_daily
                    .entry((client.to_string(), day))
                    .or_insert(0) += 1;
            }
            day = day.succ_opt().unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn year_window() -> WindowSpan {
        WindowSpan {
            id: 1,
            label: "FY25".to_string(),
            start: date(2025, 1, 1),
            end: date(2025, 12, 31),
        }
    }

    // Tests for the cap formulas

    #[test]
    fn test_max_simultaneous_rounds_and_floors_at_one() {
        assert_eq!(max_simultaneous(2, 10.0), 1); // round(0.2) = 0 -> 1
        assert_eq!(max_simultaneous(10, 10.0), 1);
        assert_eq!(max_simultaneous(25, 10.0), 3); // round(2.5) = 3
        assert_eq!(max_simultaneous(50, 20.0), 10);
        assert_eq!(max_simultaneous(0, 10.0), 1);
    }

    #[test]
    fn test_client_cap_floors_at_one() {
        assert_eq!(client_cap(2), 1);
        assert_eq!(client_cap(9), 1);
        assert_eq!(client_cap(10), 1);
        assert_eq!(client_cap(20), 2);
        assert_eq!(client_cap(35), 3);
    }

    // Tests for window intersection

    #[test]
    fn test_window_intersect_partial_overlap() {
        let window = year_window();
        let overlap = window.intersect(date(2024, 12, 20), date(2025, 1, 10));
        assert_eq!(overlap, Some((date(2025, 1, 1), date(2025, 1, 10))));
    }

    #[test]
    fn test_window_intersect_disjoint() {
        let window = year_window();
        assert_eq!(window.intersect(date(2026, 1, 1), date(2026, 2, 1)), None);
    }

    // Tests for fits/commit

    #[test]
    fn test_global_cap_blocks_overlapping_interval() {
        let caps = HashMap::from([("acme".to_string(), 5)]);
        let mut ledger = OccupancyLedger::new(1, caps, &[]);

        ledger.commit(date(2025, 2, 3), date(2025, 2, 14), "acme");
        assert!(!ledger.fits(date(2025, 2, 10), date(2025, 2, 21), "acme"));
        assert!(ledger.fits(date(2025, 2, 17), date(2025, 2, 28), "acme"));
    }

    #[test]
    fn test_client_cap_applies_inside_windows_only() {
        let caps = HashMap::from([("acme".to_string(), 1)]);
        let window = WindowSpan {
            id: 7,
            label: "Q1".to_string(),
            start: date(2025, 1, 1),
            end: date(2025, 3, 31),
        };
        let mut ledger = OccupancyLedger::new(10, caps, &[window]);

        ledger.commit(date(2025, 2, 3), date(2025, 2, 14), "acme");
        // Same client, same days, inside the window: over the client cap
        assert!(!ledger.fits(date(2025, 2, 10), date(2025, 2, 21), "acme"));
        // Outside the window the client cap does not apply
        assert!(ledger.fits(date(2025, 4, 7), date(2025, 4, 18), "acme"));
    }

    #[test]
    fn test_client_cap_does_not_cross_clients() {
        let caps = HashMap::from([("acme".to_string(), 1), ("globex".to_string(), 1)]);
        let mut ledger = OccupancyLedger::new(10, caps, &[year_window()]);

        ledger.commit(date(2025, 2, 3), date(2025, 2, 14), "acme");
        assert!(ledger.fits(date(2025, 2, 3), date(2025, 2, 14), "globex"));
    }

    #[test]
    fn test_staggered_commits_respect_caps() {
        let caps = HashMap::from([("acme".to_string(), 1)]);
        let mut ledger = OccupancyLedger::new(1, caps, &[year_window()]);

        ledger.commit(date(2025, 1, 6), date(2025, 1, 20), "acme");
        ledger.commit(date(2025, 1, 21), date(2025, 2, 4), "acme");
        assert!(!ledger.fits(date(2025, 1, 15), date(2025, 1, 29), "acme"));
        assert!(ledger.fits(date(2025, 2, 5), date(2025, 2, 19), "acme"));
    }
}

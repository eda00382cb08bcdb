use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashSet;

/// Billable hours per business day.
pub const HOURS_PER_DAY: f64 = 8.0;

/// Brazilian regions with holidays on top of the national set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Sp,
    Rj,
    Rs,
}

/// Infer the holiday region from a free-form locality string.
///
/// Lowercased substring match; localities outside the known regions fall
/// back to the national holiday set only.
pub fn region_of(locality: &str) -> Option<Region> {
    let locality = locality.to_lowercase();
    let matches_any = |keys: &[&str]| keys.iter().any(|k| locality.contains(k));

    if matches_any(&["são paulo", "sao paulo", "sp", "campinas", "santos"]) {
        Some(Region::Sp)
    } else if matches_any(&["rio de janeiro", "rj"]) {
        Some(Region::Rj)
    } else if matches_any(&["porto alegre", "rs", "alegrete"]) {
        Some(Region::Rs)
    } else {
        None
    }
}

/// Easter Sunday for a given year (Anonymous Gregorian algorithm).
pub fn easter(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = ((h + l - 7 * m + 114) % 31) + 1;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32).unwrap()
}

// National fixed-date holidays as (month, day)
const NATIONAL_FIXED: [(u32, u32); 8] = [
    (1, 1),   // Confraternização Universal
    (4, 21),  // Tiradentes
    (5, 1),   // Dia do Trabalho
    (9, 7),   // Independência
    (10, 12), // Nossa Senhora Aparecida
    (11, 2),  // Finados
    (11, 15), // Proclamação da República
    (12, 25), // Natal
];

/// Holiday set for one year, optionally extended with regional dates.
pub fn holidays(year: i32, region: Option<Region>) -> HashSet<NaiveDate> {
    let mut set: HashSet<NaiveDate> = NATIONAL_FIXED
        .iter()
        .map(|&(month, day)| NaiveDate::from_ymd_opt(year, month, day).unwrap())
        .collect();

    // Movable holidays anchored on Easter
    let easter_sunday = easter(year);
    set.insert(easter_sunday - Duration::days(47)); // Carnaval
    set.insert(easter_sunday - Duration::days(2)); // Sexta-feira Santa
    set.insert(easter_sunday + Duration::days(60)); // Corpus Christi

    let regional: &[(u32, u32)] = match region {
        Some(Region::Sp) => &[(7, 9), (11, 20)],
        Some(Region::Rj) => &[(4, 23), (11, 20)],
        Some(Region::Rs) => &[(9, 20)],
        None => &[],
    };
    for &(month, day) in regional {
        set.insert(NaiveDate::from_ymd_opt(year, month, day).unwrap());
    }

    set
}

/// Bridge days ("pontes") inferred from a holiday set.
///
/// A holiday on a Tuesday turns the preceding Monday into a bridge; a
/// holiday on a Thursday turns the following Friday into one. Other
/// weekdays produce no bridges.
pub fn bridge_days(holidays: &HashSet<NaiveDate>) -> HashSet<NaiveDate> {
    holidays
        .iter()
        .filter_map(|holiday| match holiday.weekday() {
            Weekday::Tue => Some(*holiday - Duration::days(1)),
            Weekday::Thu => Some(*holiday + Duration::days(1)),
            _ => None,
        })
        .collect()
}

/// All non-working dates (holidays plus bridges) for every year touched by
/// the [start, end] range.
pub fn non_working_days(
    start: NaiveDate,
    end: NaiveDate,
    region: Option<Region>,
) -> HashSet<NaiveDate> {
    let mut days = HashSet::new();
    for year in start.year()..=end.year() {
        let year_holidays = holidays(year, region);
        days.extend(bridge_days(&year_holidays));
        days.extend(year_holidays);
    }
    days
}

/// True for Monday through Friday.
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Billable hours in [start, end] inclusive for a region.
///
/// Counts weekdays that are neither holidays nor bridge days, at
/// [HOURS_PER_DAY] each. Ranges spanning a year boundary merge the
/// non-working sets of both years.
pub fn business_hours(start: NaiveDate, end: NaiveDate, region: Option<Region>) -> f64 {
    if end < start {
        return 0.0;
    }
    business_hours_with(&non_working_days(start, end, region), start, end)
}

/// Billable hours against a precomputed non-working set.
///
/// The set must cover every year the range touches; schedulers use this to
/// avoid rebuilding holiday sets per candidate.
pub fn business_hours_with(
    non_working: &HashSet<NaiveDate>,
    start: NaiveDate,
    end: NaiveDate,
) -> f64 {
    if end < start {
        return 0.0;
    }

    let mut days = 0u32;
    let mut current = start;
    while current <= end {
        if is_weekday(current) && !non_working.contains(&current) {
            days += 1;
        }
        current = current.succ_opt().unwrap();
    }

    days as f64 * HOURS_PER_DAY
}

/// Whether a date qualifies as a vacation start.
///
/// The date must be a weekday and not a holiday. Unless
/// `allow_start_before_holiday` is set, the two following days must not be
/// holidays either, so the first vacation days never absorb one.
pub fn is_valid_start(
    date: NaiveDate,
    holidays: &HashSet<NaiveDate>,
    allow_start_before_holiday: bool,
) -> bool {
    if !is_weekday(date) || holidays.contains(&date) {
        return false;
    }
    if allow_start_before_holiday {
        return true;
    }
    !holidays.contains(&(date + Duration::days(1)))
        && !holidays.contains(&(date + Duration::days(2)))
}

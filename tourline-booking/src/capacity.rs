use std::collections::HashMap;

use chrono::NaiveDate;

use tourline_core::catalog::{AvailabilityReport, DayAvailability, TourInfo};
use tourline_core::holds::{DayCapacity, HoldLedger};
use tourline_core::CoreResult;
use tourline_shared::dates::each_day;

/// Capacity to hold against on each date of `[start, end]`.
///
/// Dates missing from the report's calendar fall back to the tour maximum.
pub fn capacity_days(
    report: &AvailabilityReport,
    tour: &TourInfo,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DayCapacity> {
    let by_date: HashMap<NaiveDate, u32> = report
        .calendar
        .iter()
        .map(|day| (day.date, day.open_spots))
        .collect();
    each_day(start, end)
        .map(|date| DayCapacity {
            date,
            open_spots: by_date.get(&date).copied().unwrap_or(tour.max_participants),
        })
        .collect()
}

/// Subtracts spots already held by bookings from a catalog report.
///
/// A report without a calendar gets one built from the tour maximum first.
pub async fn apply_holds(
    ledger: &dyn HoldLedger,
    tour: &TourInfo,
    mut report: AvailabilityReport,
    start: NaiveDate,
    end: NaiveDate,
    participants: u32,
) -> CoreResult<AvailabilityReport> {
    if !report.available && report.unavailable_dates.is_empty() {
        // Rejected before any date was looked at.
        return Ok(report);
    }
    if report.calendar.is_empty() {
        report.calendar = each_day(start, end)
            .map(|date| DayAvailability {
                date,
                open_spots: tour.max_participants,
                is_available: !report.unavailable_dates.contains(&date),
                recorded: false,
            })
            .collect();
    }
    for day in report.calendar.iter_mut() {
        let held = ledger.held_spots(tour.id, day.date).await?;
        day.open_spots = day.open_spots.saturating_sub(held);
        if day.open_spots < participants {
            day.is_available = false;
        }
    }
    let unavailable: Vec<NaiveDate> = report
        .calendar
        .iter()
        .filter(|day| !day.is_available)
        .map(|day| day.date)
        .collect();
    if !unavailable.is_empty() {
        let listed: Vec<String> = unavailable.iter().map(|d| d.to_string()).collect();
        report.available = false;
        report.message = format!("Not available on: {}", listed.join(", "));
        report.unavailable_dates = unavailable;
    }
    Ok(report)
}

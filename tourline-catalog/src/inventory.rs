use std::collections::HashMap;

use chrono::NaiveDate;

use tourline_core::catalog::{AvailabilityReport, DayAvailability, TourInfo};
use tourline_shared::dates::each_day;

use crate::tour::AvailabilityRecord;

/// Per-date capacity check over an inclusive date range.
///
/// Pure read: nothing is reserved here. Dates without a record count as open at
/// the tour's full capacity.
pub struct AvailabilityChecker;

impl AvailabilityChecker {
    pub fn evaluate(
        tour: &TourInfo,
        records: &[AvailabilityRecord],
        start: NaiveDate,
        end: NaiveDate,
        participants: u32,
    ) -> AvailabilityReport {
        if participants > tour.max_participants {
            return AvailabilityReport {
                available: false,
                message: format!("Maximum {} participants allowed", tour.max_participants),
                unavailable_dates: Vec::new(),
                max_participants: Some(tour.max_participants),
                calendar: Vec::new(),
            };
        }

        let by_date: HashMap<NaiveDate, &AvailabilityRecord> =
            records.iter().map(|record| (record.date, record)).collect();

        let calendar: Vec<DayAvailability> = each_day(start, end)
            .map(|date| match by_date.get(&date) {
                Some(record) => {
                    let open_spots = if record.is_available { record.available_spots } else { 0 };
                    DayAvailability {
                        date,
                        open_spots,
                        is_available: record.is_available && record.available_spots >= participants,
                        recorded: true,
                    }
                }
                None => DayAvailability {
                    date,
                    open_spots: tour.max_participants,
                    is_available: true,
                    recorded: false,
                },
            })
            .collect();

        let unavailable_dates: Vec<NaiveDate> = calendar
            .iter()
            .filter(|day| !day.is_available)
            .map(|day| day.date)
            .collect();

        if unavailable_dates.is_empty() {
            AvailabilityReport {
                available: true,
                message: "Tour is available for selected dates".to_string(),
                unavailable_dates,
                max_participants: Some(tour.max_participants),
                calendar,
            }
        } else {
            let listed: Vec<String> = unavailable_dates.iter().map(|d| d.to_string()).collect();
            AvailabilityReport {
                available: false,
                message: format!("Not available on: {}", listed.join(", ")),
                unavailable_dates,
                max_participants: Some(tour.max_participants),
                calendar,
            }
        }
    }
}

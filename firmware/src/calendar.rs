#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Calendar arithmetic between the RTC's civil date fields and unix
//! seconds.
//!
//! The RTC hardware counts years 2000-2099, so every value passing through
//! here fits comfortably in the unsigned 32-bit unix range.

/// A civil date and time as the RTC registers express it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CivilDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

const DAY_SECONDS: i64 = 86_400;

/// Converts a civil date and time to unix seconds, clamping to the
/// representable range.
pub fn unix_from_civil(datetime: CivilDateTime) -> u32 {
    let days = days_from_civil(
        i64::from(datetime.year),
        i64::from(datetime.month),
        i64::from(datetime.day),
    );
    let seconds = days * DAY_SECONDS
        + i64::from(datetime.hour) * 3_600
        + i64::from(datetime.minute) * 60
        + i64::from(datetime.second);
    u32::try_from(seconds.clamp(0, i64::from(u32::MAX))).unwrap_or(u32::MAX)
}

/// Converts unix seconds to the civil fields plus a weekday index
/// (0 == Monday).
pub fn civil_from_unix(seconds: u32) -> (CivilDateTime, u8) {
    let total = i64::from(seconds);
    let days = total / DAY_SECONDS;
    let of_day = total % DAY_SECONDS;

    let (year, month, day) = civil_from_days(days);
    let datetime = CivilDateTime {
        year,
        month,
        day,
        hour: (of_day / 3_600) as u8,
        minute: (of_day / 60 % 60) as u8,
        second: (of_day % 60) as u8,
    };
    (datetime, weekday_from_days(days))
}

/// Weekday index for a day count since the epoch (0 == Monday).
pub fn weekday_from_days(days: i64) -> u8 {
    // 1970-01-01 was a Thursday.
    ((days + 3).rem_euclid(7)) as u8
}

// Howard Hinnant's civil-from-days algorithms, restricted to the
// positive-era range the RTC can produce.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let shifted_month = (month + 9) % 12;
    let day_of_year = (153 * shifted_month + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

fn civil_from_days(days: i64) -> (u16, u8, u8) {
    let shifted = days + 719_468;
    let era = shifted.div_euclid(146_097);
    let day_of_era = shifted - era * 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1_460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let year = year_of_era + era * 400;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let shifted_month = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * shifted_month + 2) / 5 + 1;
    let month = if shifted_month < 10 {
        shifted_month + 3
    } else {
        shifted_month - 9
    };
    let year = if month <= 2 { year + 1 } else { year };
    (year as u16, month as u8, day as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_is_a_thursday() {
        let (datetime, weekday) = civil_from_unix(0);
        assert_eq!(
            datetime,
            CivilDateTime {
                year: 1970,
                month: 1,
                day: 1,
                hour: 0,
                minute: 0,
                second: 0,
            }
        );
        assert_eq!(weekday, 3);
    }

    #[test]
    fn leap_day_boundary_converts_exactly() {
        // 2000-03-01T00:00:00Z, the day after a 400-year leap day.
        let (datetime, weekday) = civil_from_unix(951_868_800);
        assert_eq!((datetime.year, datetime.month, datetime.day), (2000, 3, 1));
        assert_eq!(weekday, 2, "2000-03-01 was a Wednesday");
        assert_eq!(unix_from_civil(datetime), 951_868_800);
    }

    #[test]
    fn civil_fields_carry_time_of_day() {
        let (datetime, _) = civil_from_unix(951_868_800 + 7 * 3_600 + 30 * 60 + 15);
        assert_eq!(
            (datetime.hour, datetime.minute, datetime.second),
            (7, 30, 15)
        );
    }

    #[test]
    fn conversion_round_trips_across_the_rtc_range() {
        for seconds in [
            0_u32,
            946_684_800,
            1_700_000_000,
            1_787_356_800,
            4_102_444_800,
            u32::MAX,
        ] {
            let (datetime, _) = civil_from_unix(seconds);
            assert_eq!(unix_from_civil(datetime), seconds);
        }
    }
}

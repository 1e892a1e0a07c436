use serde::Serialize;
use utoipa::ToSchema;

/// Salaries are monthly; a month is always treated as 30 days.
pub const DAYS_PER_MONTH: f64 = 30.0;

/// Paid minutes in one working day (8 hours).
pub const WORKDAY_MINUTES: f64 = 8.0 * 60.0;

/// Worked minutes are billed in blocks of this size, rounded up.
pub const ROUNDING_STEP_MINUTES: u64 = 5;

/// Result of applying the pay rules to a number of worked seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Earnings {
    #[schema(example = 1810)]
    pub seconds: u64,
    #[schema(example = 35)]
    pub rounded_minutes: u64,
    #[schema(example = 500.0)]
    pub daily_rate: f64,
    #[schema(example = 1.0416)]
    pub per_minute_rate: f64,
    #[schema(example = 36.46)]
    pub amount: f64,
}

impl Earnings {
    /// Amount rounded to whole currency units, as shown on dashboards and reports.
    pub fn display_amount(&self) -> i64 {
        self.amount.round() as i64
    }
}

/// Monthly salary / 30. Negative or non-finite salaries earn nothing.
pub fn daily_rate(monthly_salary: f64) -> f64 {
    if monthly_salary.is_finite() && monthly_salary > 0.0 {
        monthly_salary / DAYS_PER_MONTH
    } else {
        0.0
    }
}

/// Worked minutes rounded up to the next multiple of five.
///
/// `ceil(ceil(s / 60) / 5) == ceil((s / 60) / 5)`, so the computation stays in
/// integers.
pub fn rounded_minutes(seconds: u64) -> u64 {
    let whole_minutes = seconds.div_ceil(60);
    whole_minutes.div_ceil(ROUNDING_STEP_MINUTES) * ROUNDING_STEP_MINUTES
}

pub fn per_minute_rate(daily_rate: f64) -> f64 {
    daily_rate / WORKDAY_MINUTES
}

/// Pay for `seconds` of work against a monthly salary, capped at the daily rate.
pub fn calculate(seconds: u64, monthly_salary: f64) -> Earnings {
    let daily = daily_rate(monthly_salary);
    let per_minute = per_minute_rate(daily);
    let minutes = rounded_minutes(seconds);
    let amount = (per_minute * minutes as f64).min(daily);

    Earnings {
        seconds,
        rounded_minutes: minutes,
        daily_rate: daily,
        per_minute_rate: per_minute,
        amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_example() {
        let e = calculate(1810, 15_000.0);
        assert_eq!(e.daily_rate, 500.0);
        assert_eq!(e.rounded_minutes, 35);
        assert!((e.per_minute_rate - 500.0 / 480.0).abs() < 1e-12);
        assert!((e.amount - 36.458_333).abs() < 1e-5);
        assert_eq!(e.display_amount(), 36);
    }

    #[test]
    fn zero_seconds_earn_nothing() {
        let e = calculate(0, 15_000.0);
        assert_eq!(e.rounded_minutes, 0);
        assert_eq!(e.amount, 0.0);
    }

    #[test]
    fn rounding_boundaries() {
        assert_eq!(rounded_minutes(1), 5);
        assert_eq!(rounded_minutes(60), 5);
        assert_eq!(rounded_minutes(300), 5);
        assert_eq!(rounded_minutes(301), 10);
        assert_eq!(rounded_minutes(600), 10);
        assert_eq!(rounded_minutes(3599), 60);
    }

    #[test]
    fn rounded_minutes_is_a_multiple_of_five_and_covers_the_time_worked() {
        for seconds in (0..20_000).step_by(7) {
            let minutes = rounded_minutes(seconds);
            assert_eq!(minutes % ROUNDING_STEP_MINUTES, 0, "seconds={seconds}");
            assert!(minutes >= seconds.div_ceil(60), "seconds={seconds}");
            assert!(minutes < seconds.div_ceil(60) + ROUNDING_STEP_MINUTES);
        }
    }

    #[test]
    fn earnings_never_exceed_daily_rate() {
        for salary in [0.0, 1.0, 9_999.0, 15_000.0, 120_000.0] {
            for seconds in [0, 59, 1810, 8 * 3600, 8 * 3600 + 1, 24 * 3600, u32::MAX as u64] {
                let e = calculate(seconds, salary);
                assert!(e.amount <= daily_rate(salary), "salary={salary} seconds={seconds}");
            }
        }
    }

    #[test]
    fn full_day_hits_the_cap() {
        let e = calculate(10 * 3600, 15_000.0);
        assert_eq!(e.amount, 500.0);
    }

    #[test]
    fn invalid_salary_earns_nothing() {
        assert_eq!(calculate(3600, -100.0).amount, 0.0);
        assert_eq!(calculate(3600, f64::NAN).amount, 0.0);
    }
}

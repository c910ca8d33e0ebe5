// mvs-core/src/units.rs

use uom::si::f64::{Ratio as UomRatio, Time as UomTime};

// Public canonical unit types (SI, f64)
pub type Ratio = UomRatio;
pub type Time = UomTime;

#[inline]
pub fn minutes(v: f64) -> Time {
    use uom::si::time::minute;
    Time::new::<minute>(v)
}

#[inline]
pub fn hours(v: f64) -> Time {
    use uom::si::time::hour;
    Time::new::<hour>(v)
}

#[inline]
pub fn days(v: f64) -> Time {
    use uom::si::time::day;
    Time::new::<day>(v)
}

/// Number of whole steps of length `step` in `span`.
#[inline]
pub fn steps_in(span: Time, step: Time) -> f64 {
    use uom::si::ratio::ratio;
    let n: Ratio = span / step;
    n.get::<ratio>().floor()
}

/// Unit labels carried by `Quantity` values.
pub mod labels {
    pub const KWH: &str = "kWh";
    pub const KW: &str = "kW";
    pub const YEAR: &str = "year";
    pub const DAY: &str = "day";
    pub const MINUTE: &str = "minute";
    pub const FACTOR: &str = "factor";
    pub const NONE: &str = "NA";

    /// Unit of an annualized money figure, e.g. `EUR/year`.
    pub fn per_year(currency: &str) -> String {
        format!("{currency}/{YEAR}")
    }
}

pub mod constants {
    /// Days used to annualize flows of a shorter evaluated period.
    pub const DAYS_PER_YEAR: f64 = 365.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_per_day() {
        assert_eq!(steps_in(days(1.0), minutes(60.0)), 24.0);
        assert_eq!(steps_in(days(1.0), minutes(15.0)), 96.0);
        assert_eq!(steps_in(hours(1.0), minutes(25.0)), 2.0);
    }

    #[test]
    fn per_year_label() {
        assert_eq!(labels::per_year("EUR"), "EUR/year");
    }
}

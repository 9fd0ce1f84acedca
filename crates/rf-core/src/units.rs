// rf-core/src/units.rs

use uom::si::f64::{Pressure as UomPressure, Time as UomTime};

// Public canonical unit types (SI, f64)
pub type Pressure = UomPressure;
pub type Time = UomTime;

/// Seconds in one day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn days(v: f64) -> Time {
    use uom::si::time::day;
    Time::new::<day>(v)
}

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn bar(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

/// Day count expressed in seconds.
#[inline]
pub fn days_to_seconds(v: f64) -> f64 {
    use uom::si::time::second;
    days(v).get::<second>()
}

/// Seconds expressed as a day count.
#[inline]
pub fn seconds_to_days(v: f64) -> f64 {
    use uom::si::time::day;
    s(v).get::<day>()
}

#[inline]
pub fn bar_to_pa(v: f64) -> f64 {
    use uom::si::pressure::pascal;
    bar(v).get::<pascal>()
}

#[inline]
pub fn pa_to_bar(v: f64) -> f64 {
    use uom::si::pressure::bar;
    pa(v).get::<bar>()
}

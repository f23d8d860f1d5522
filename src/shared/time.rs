use std::{
    cmp,
    fmt::Display,
    ops::{Add, AddAssign, Sub},
};

use serde::{Deserialize, Serialize};

use crate::shared::geo::Distance;

const METERS_PER_KILOMETER: f64 = 1000.0;
const MINUTES_PER_HOUR: f64 = 60.0;

/// Elapsed time in minutes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Duration(f64);

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}min", self.0))
    }
}

impl Duration {
    pub const fn from_minutes(minutes: f64) -> Self {
        Self(minutes)
    }

    pub const fn from_seconds(seconds: f64) -> Self {
        Self(seconds / 60.0)
    }

    pub const fn as_minutes(&self) -> f64 {
        self.0
    }

    /// Total order over the underlying float, used to key the search frontier.
    pub fn total_cmp(&self, other: &Self) -> cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Vehicle speed, stored in km/h as configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Speed(f64);

impl Speed {
    pub const fn from_kmh(kmh: f64) -> Self {
        Self(kmh)
    }

    pub const fn as_meters_per_minute(&self) -> f64 {
        self.0 * METERS_PER_KILOMETER / MINUTES_PER_HOUR
    }

    /// Time needed to cover `distance` at this speed.
    pub fn travel_time(&self, distance: Distance) -> Duration {
        Duration(distance.as_meters() / self.as_meters_per_minute())
    }
}

#[test]
fn speed_conversion_test() {
    let speed = Speed::from_kmh(60.0);
    assert_eq!(speed.as_meters_per_minute(), 1000.0);
}

#[test]
fn travel_time_test() {
    let speed = Speed::from_kmh(30.0);
    let time = speed.travel_time(Distance::from_meters(1000.0));
    assert_eq!(time, Duration::from_minutes(2.0));
}

#[test]
fn duration_seconds_test() {
    assert_eq!(Duration::from_seconds(90.0), Duration::from_minutes(1.5));
}

#[test]
fn duration_ord_test() {
    let a = Duration::from_minutes(1.0);
    let b = Duration::from_minutes(2.0);
    assert!(a < b);
    assert_eq!(a.total_cmp(&b), cmp::Ordering::Less);
}

use std::{
    cmp,
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Div},
};

use serde::{Deserialize, Serialize};

/// Mean earth radius used by the great-circle formula.
pub(crate) const EARTH_RADIUS: Distance = Distance::from_meters(6_371_000.0);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Add for Distance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Distance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0
    }
}

impl Div for Distance {
    type Output = f64;
    fn div(self, rhs: Self) -> Self::Output {
        self.0 / rhs.0
    }
}

impl Sum for Distance {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, distance| acc + distance)
    }
}

impl From<u32> for Distance {
    fn from(meters: u32) -> Self {
        Self(meters as f64)
    }
}

impl Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}m", self.0))
    }
}

impl Distance {
    pub const fn from_meters(distance: f64) -> Self {
        Self(distance)
    }

    pub const fn from_kilometers(distance: f64) -> Self {
        Self(distance * 1000.0)
    }

    pub const fn as_meters(&self) -> f64 {
        self.0
    }

    pub const fn as_kilometers(&self) -> f64 {
        self.0 / 1000.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

/// A point on the globe in degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}, {}", self.latitude, self.longitude))
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(value: Coordinate) -> Self {
        (value.latitude, value.longitude)
    }
}

impl Coordinate {
    /// Haversine distance along the earth's surface.
    /// Identical coordinates are exactly zero apart.
    pub fn great_circle_distance(&self, coord: &Self) -> Distance {
        if self == coord {
            return Distance::default();
        }
        let dist_lat = f64::to_radians(coord.latitude - self.latitude);
        let dist_lon = f64::to_radians(coord.longitude - self.longitude);
        let a = f64::powi(f64::sin(dist_lat / 2.0), 2)
            + f64::cos(f64::to_radians(self.latitude))
                * f64::cos(f64::to_radians(coord.latitude))
                * f64::sin(dist_lon / 2.0)
                * f64::sin(dist_lon / 2.0);
        let c = 2.0 * f64::atan2(f64::sqrt(a), f64::sqrt(1.0 - a));
        Distance::from_meters(EARTH_RADIUS.as_meters() * c)
    }
}

#[test]
fn great_circle_test() {
    let coord_a = Coordinate {
        latitude: 48.85800943005911,
        longitude: 2.3514350059357927,
    };

    let coord_b = Coordinate {
        latitude: 51.5052389927712,
        longitude: -0.12495407345099824,
    };
    let d = coord_a.great_circle_distance(&coord_b);
    assert!((d.as_kilometers() - 343.5).abs() < 5.0);
}

#[test]
fn great_circle_symmetric_test() {
    let a = Coordinate::from((55.611087, 37.20829));
    let b = Coordinate::from((55.595884, 37.209755));
    let there = a.great_circle_distance(&b).as_meters();
    let back = b.great_circle_distance(&a).as_meters();
    assert!((there - back).abs() < 1e-6);
}

#[test]
fn great_circle_zero_test() {
    let a = Coordinate::from((55.611087, 37.20829));
    assert!(a.great_circle_distance(&a).is_zero());
}

#[test]
fn distance_eq_test() {
    let dist_a = Distance::from_meters(1000.0);
    let dist_b = Distance::from_kilometers(1.0);
    assert_eq!(dist_a, dist_b)
}

#[test]
fn distance_cmp_test() {
    let dist_a = Distance::from_meters(1000.0);
    let dist_b = Distance::from_kilometers(0.5);
    assert!(dist_a > dist_b)
}

//! Numeric unit conversions.
//!
//! All conversions round half away from zero (`f64::round`), so `24.5` becomes `25`
//! and `-0.5` becomes `-1`.

const KELVIN_OFFSET: f64 = 273.15;
const MPS_TO_KMH: f64 = 3.6;
const KMH_PER_MPH: f64 = 1.609_344;

pub fn kelvin_to_celsius(kelvin: f64) -> i32 {
    (kelvin - KELVIN_OFFSET).round() as i32
}

pub fn mps_to_kmh(mps: f64) -> i32 {
    (mps * MPS_TO_KMH).round() as i32
}

pub fn meters_to_km(meters: f64) -> i32 {
    (meters / 1000.0).round() as i32
}

pub fn celsius_to_fahrenheit(celsius: i32) -> i32 {
    (f64::from(celsius) * 9.0 / 5.0 + 32.0).round() as i32
}

pub fn kmh_to_mph(kmh: i32) -> i32 {
    (f64::from(kmh) / KMH_PER_MPH).round() as i32
}

use std::error::Error;
use std::f64::consts::PI;
use std::fmt;

/// InputValueError is used if a caller hands a value outside of its documented contract, e.g. an
/// accelerator pedal position above 1.0. It marks a programming error on the caller's side, not a
/// degraded-data condition.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueError {
    pub name: &'static str,
    pub value: f64,
}

impl fmt::Display for InputValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid input value {} for {}", self.value, self.name)
    }
}

impl Error for InputValueError {}

/// sign returns -1.0, 0.0 or 1.0. Unlike `f64::signum` it maps zero to zero.
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// wrap_angle maps an angle in radians into [-PI, PI].
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// round_to_decimals rounds x to the given number of decimal places.
pub fn round_to_decimals(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

/// stable_hash returns a hash of a string that does not change between runs, platforms or
/// compiler versions (31-polynomial over UTF-16 code units with wrapping 32 bit arithmetic).
pub fn stable_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32))
}

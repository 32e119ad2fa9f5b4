use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;
use std::time::Duration;

use crate::shared::constants::NANOS_PER_SECOND;

/// Rational presentation timestamp: `value / timescale` seconds.
#[derive(Clone, Copy, Debug)]
pub struct MediaTime {
    value: i64,
    timescale: i32,
}

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime {
        value: 0,
        timescale: 1,
    };

    pub fn new(value: i64, timescale: i32) -> Self {
        assert!(timescale > 0, "timescale must be greater than 0: {timescale}");
        Self { value, timescale }
    }

    /// Nanosecond-resolution time from a number of seconds.
    pub fn from_seconds(seconds: f64) -> Self {
        Self::new((seconds * NANOS_PER_SECOND as f64).round() as i64, NANOS_PER_SECOND)
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self::new(duration.as_nanos() as i64, NANOS_PER_SECOND)
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn timescale(&self) -> i32 {
        self.timescale
    }

    pub fn seconds(&self) -> f64 {
        self.value as f64 / self.timescale as f64
    }

    /// Expresses this time in ticks of `timescale`, rounding to nearest.
    pub fn rescale(&self, timescale: i32) -> i64 {
        assert!(timescale > 0, "timescale must be greater than 0: {timescale}");
        if timescale == self.timescale {
            return self.value;
        }
        let numerator = i128::from(self.value) * i128::from(timescale);
        let denominator = i128::from(self.timescale);
        let half = denominator / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            (numerator - half) / denominator
        };
        rounded as i64
    }

    fn cross(&self, other: &Self) -> (i128, i128) {
        (
            i128::from(self.value) * i128::from(other.timescale),
            i128::from(other.value) * i128::from(self.timescale),
        )
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        let (lhs, rhs) = self.cross(other);
        lhs == rhs
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs) = self.cross(other);
        lhs.cmp(&rhs)
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    /// Exact in the least common multiple of both timescales. When that does
    /// not fit in an `i32`, the result keeps `self`'s timescale and `rhs` is
    /// rounded to it, so adding a non-negative time never moves backwards.
    fn add(self, rhs: MediaTime) -> MediaTime {
        let timescale =
            common_timescale(self.timescale, rhs.timescale).unwrap_or(self.timescale);
        MediaTime::new(self.rescale(timescale) + rhs.rescale(timescale), timescale)
    }
}

fn common_timescale(a: i32, b: i32) -> Option<i32> {
    let lcm = i64::from(a) / gcd(i64::from(a), i64::from(b)) * i64::from(b);
    i32::try_from(lcm).ok()
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Add<Duration> for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: Duration) -> MediaTime {
        self + MediaTime::from_duration(rhs)
    }
}

impl From<Duration> for MediaTime {
    fn from(duration: Duration) -> Self {
        Self::from_duration(duration)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.timescale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_from_seconds_uses_nanoseconds() {
        let t = MediaTime::from_seconds(1.5);
        assert_eq!(t.value(), 1_500_000_000);
        assert_eq!(t.timescale(), NANOS_PER_SECOND);
        assert_relative_eq!(t.seconds(), 1.5);
    }

    #[test]
    fn test_equality_across_timescales() {
        assert_eq!(MediaTime::new(1, 2), MediaTime::new(300, 600));
        assert_eq!(MediaTime::ZERO, MediaTime::from_seconds(0.0));
    }

    #[test]
    fn test_ordering() {
        assert!(MediaTime::new(1, 30) < MediaTime::new(1, 24));
        assert!(MediaTime::from_seconds(2.0) > MediaTime::new(599, 300));
    }

    #[rstest]
    #[case::exact(MediaTime::new(1, 30), 600, 20)]
    #[case::rounds_up(MediaTime::new(2, 3), 10, 7)]
    #[case::rounds_down(MediaTime::new(1, 3), 10, 3)]
    #[case::negative(MediaTime::new(-1, 3), 10, -3)]
    #[case::same_scale(MediaTime::new(42, 600), 600, 42)]
    fn test_rescale(#[case] time: MediaTime, #[case] timescale: i32, #[case] expected: i64) {
        assert_eq!(time.rescale(timescale), expected);
    }

    #[test]
    fn test_add_uses_common_timescale() {
        let sum = MediaTime::new(1, 30) + MediaTime::new(1, 600);
        assert_eq!(sum.timescale(), 600);
        assert_eq!(sum.value(), 21);

        let sum = MediaTime::new(1, 7) + MediaTime::new(1, 30);
        assert_eq!(sum, MediaTime::new(37, 210));
        assert_eq!(sum.timescale(), 210);
    }

    #[rstest]
    #[case::coprime(MediaTime::new(1, 7), 30)]
    #[case::coprime_reversed(MediaTime::new(1, 30), 7)]
    #[case::nanos_and_movie(MediaTime::from_seconds(0.123_456_789), 600)]
    #[case::movie_and_nanos(MediaTime::new(7, 600), NANOS_PER_SECOND)]
    #[case::odd_nanos(MediaTime::new(5, 999_999_937), 1_000_000_007)]
    fn test_adding_zero_never_moves_backwards(#[case] time: MediaTime, #[case] timescale: i32) {
        let sum = time + MediaTime::new(0, timescale);
        assert!(sum >= time, "{time} + 0/{timescale} = {sum}");
    }

    #[test]
    fn test_add_without_common_timescale_keeps_left_scale() {
        let sum = MediaTime::new(7, 600) + MediaTime::new(1, NANOS_PER_SECOND);
        assert_eq!(sum.timescale(), 600);
        assert_eq!(sum, MediaTime::new(7, 600));
    }

    #[test]
    fn test_add_duration() {
        let t = MediaTime::from_seconds(1.0) + Duration::from_millis(250);
        assert_relative_eq!(t.seconds(), 1.25);
    }

    #[test]
    #[should_panic(expected = "timescale must be greater than 0")]
    fn test_zero_timescale_panics() {
        MediaTime::new(1, 0);
    }
}

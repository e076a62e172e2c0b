//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign
{
    // Check that the dimentions match
    if point_0.len() != point_1.len() {
        return None;
    }

    let mut sum = T::zero();

    for (a, b) in point_0.iter().zip(point_1.iter()) {
        sum += (*a - *b).powi(2);
    }

    Some(sum.sqrt())
}

/// Return `num` evenly spaced values over the closed interval `[start, stop]`.
///
/// Both endpoints are included when `num >= 2`. A single value is just
/// `start`, and `num == 0` gives an empty vector.
pub fn linspace<T>(start: T, stop: T, num: usize) -> Vec<T>
where
    T: Float
{
    match num {
        0 => vec![],
        1 => vec![start],
        _ => {
            // Can't fail for any float type that can represent a usize
            let step = (stop - start) / T::from(num - 1).unwrap_or_else(T::infinity);

            (0..num)
                .map(|i| {
                    if i == num - 1 {
                        stop
                    }
                    else {
                        start + step * T::from(i).unwrap_or_else(T::zero)
                    }
                })
                .collect()
        }
    }
}

/// Get the signed angular distance between two angles in the range of [0, 2pi].
///
/// This function will return the shortest signed distance between a and b accounting for wrapping
/// between 0 and 2pi.
pub fn get_ang_dist_2pi<T>(a: T, b: T) -> T
where
    T: Float
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap_or_else(T::nan);

    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        -c
    }
    else {
        d
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_ang_dist_2pi() {
        const TAU: f64 = std::f64::consts::TAU;

        assert_eq!(get_ang_dist_2pi(1f64, 2f64), 1f64);
        assert_eq!(get_ang_dist_2pi(2f64, 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU), 0f64);
        assert_eq!(get_ang_dist_2pi(TAU, 0f64), 0f64);
        assert_eq!(get_ang_dist_2pi(1f64, TAU), -1f64);
        assert_eq!(get_ang_dist_2pi(0f64, TAU - 1f64), -1f64);
        assert_eq!(get_ang_dist_2pi(TAU - 1f64, 1f64), 2f64);
    }

    #[test]
    fn test_norm() {
        assert_eq!(norm(&[0f64, 0f64], &[3f64, 4f64]), Some(5f64));
        assert_eq!(norm(&[1f64, 2f64], &[1f64, 2f64]), Some(0f64));
        assert_eq!(norm(&[1f64], &[1f64, 2f64]), None);
    }

    #[test]
    fn test_linspace() {
        assert!(linspace(0f64, 1f64, 0).is_empty());
        assert_eq!(linspace(0.5f64, 1f64, 1), vec![0.5]);
        assert_eq!(linspace(0f64, 1f64, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        let ts = linspace(0f64, 3.7f64, 185);
        assert_eq!(ts.len(), 185);
        assert_eq!(ts[0], 0.0);
        assert_eq!(ts[184], 3.7);
        assert!(ts.windows(2).all(|w| w[1] > w[0]));
    }
}

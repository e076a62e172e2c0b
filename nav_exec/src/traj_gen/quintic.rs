//! Quintic polynomial curves

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::TrajGenError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Boundary conditions of a single axis over `[t0, t1]`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct BoundaryCond {
    /// Start time, seconds
    pub t0: f64,

    /// End time, seconds
    pub t1: f64,

    /// Start position
    pub q0: f64,

    /// End position
    pub q1: f64,

    /// Start velocity
    pub v0: f64,

    /// End velocity
    pub v1: f64,

    /// Start acceleration
    pub a0: f64,

    /// End acceleration
    pub a1: f64,
}

/// A quintic polynomial in `tau = t - t0`.
///
/// `q(tau) = k0 + k1 tau + k2 tau^2 + k3 tau^3 + k4 tau^4 + k5 tau^5`
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct QuinticCurve {
    t0: f64,
    t1: f64,
    k: [f64; 6],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BoundaryCond {
    /// Boundary conditions starting at `t = 0`, initially at rest with respect to acceleration,
    /// and arriving at rest at `t1`.
    pub fn arrive_at_rest(t1: f64, q0: f64, q1: f64, v0: f64) -> Self {
        Self {
            t0: 0.0,
            t1,
            q0,
            q1,
            v0,
            v1: 0.0,
            a0: 0.0,
            a1: 0.0,
        }
    }

    fn is_finite(&self) -> bool {
        [self.t0, self.t1, self.q0, self.q1, self.v0, self.v1, self.a0, self.a1]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl QuinticCurve {
    /// Solve for the unique quintic meeting the boundary conditions.
    pub fn new(bc: &BoundaryCond) -> Result<Self, TrajGenError> {
        if !bc.is_finite() {
            return Err(TrajGenError::NonFiniteBoundary);
        }
        if bc.t1 <= bc.t0 {
            return Err(TrajGenError::InvalidHorizon { t0: bc.t0, t1: bc.t1 });
        }

        let t = bc.t1 - bc.t0;
        let h = bc.q1 - bc.q0;

        let k3 = (20.0 * h
            - (8.0 * bc.v1 + 12.0 * bc.v0) * t
            - (3.0 * bc.a0 - bc.a1) * t.powi(2))
            / (2.0 * t.powi(3));

        let k4 = (-30.0 * h
            + (14.0 * bc.v1 + 16.0 * bc.v0) * t
            + (3.0 * bc.a0 - 2.0 * bc.a1) * t.powi(2))
            / (2.0 * t.powi(4));

        let k5 = (12.0 * h
            - 6.0 * (bc.v1 + bc.v0) * t
            + (bc.a1 - bc.a0) * t.powi(2))
            / (2.0 * t.powi(5));

        Ok(Self {
            t0: bc.t0,
            t1: bc.t1,
            k: [bc.q0, bc.v0, bc.a0 / 2.0, k3, k4, k5],
        })
    }

    /// Position at time `t`.
    pub fn pos(&self, t: f64) -> f64 {
        let tau = t - self.t0;
        let k = &self.k;

        k[0] + tau * (k[1] + tau * (k[2] + tau * (k[3] + tau * (k[4] + tau * k[5]))))
    }

    /// Velocity at time `t`.
    pub fn vel(&self, t: f64) -> f64 {
        let tau = t - self.t0;
        let k = &self.k;

        k[1] + tau * (2.0 * k[2] + tau * (3.0 * k[3] + tau * (4.0 * k[4] + tau * 5.0 * k[5])))
    }

    /// Acceleration at time `t`.
    pub fn acc(&self, t: f64) -> f64 {
        let tau = t - self.t0;
        let k = &self.k;

        2.0 * k[2] + tau * (6.0 * k[3] + tau * (12.0 * k[4] + tau * 20.0 * k[5]))
    }

    /// Length of the horizon in seconds.
    pub fn duration(&self) -> f64 {
        self.t1 - self.t0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_boundary_conditions_met() {
        let bc = BoundaryCond {
            t0: 1.5,
            t1: 4.0,
            q0: -0.3,
            q1: 2.2,
            v0: 0.4,
            v1: -0.1,
            a0: 0.2,
            a1: 0.05,
        };
        let curve = QuinticCurve::new(&bc).unwrap();

        assert!((curve.pos(bc.t0) - bc.q0).abs() < EPS);
        assert!((curve.pos(bc.t1) - bc.q1).abs() < EPS);
        assert!((curve.vel(bc.t0) - bc.v0).abs() < EPS);
        assert!((curve.vel(bc.t1) - bc.v1).abs() < EPS);
        assert!((curve.acc(bc.t0) - bc.a0).abs() < EPS);
        assert!((curve.acc(bc.t1) - bc.a1).abs() < EPS);
        assert_eq!(curve.duration(), 2.5);
    }

    #[test]
    fn test_rest_to_rest_peak_velocity() {
        // A rest to rest quintic peaks at 15h/8T at the midpoint
        let curve = QuinticCurve::new(&BoundaryCond::arrive_at_rest(2.0, 0.0, 1.0, 0.0)).unwrap();

        assert!((curve.vel(1.0) - 15.0 / 16.0).abs() < EPS);
        assert!((curve.pos(1.0) - 0.5).abs() < EPS);
        assert!(curve.acc(1.0).abs() < EPS);
    }

    #[test]
    fn test_invalid_boundaries() {
        let mut bc = BoundaryCond::arrive_at_rest(0.0, 0.0, 1.0, 0.0);
        assert!(matches!(
            QuinticCurve::new(&bc),
            Err(TrajGenError::InvalidHorizon { .. })
        ));

        bc.t1 = -1.0;
        assert!(matches!(
            QuinticCurve::new(&bc),
            Err(TrajGenError::InvalidHorizon { .. })
        ));

        bc.t1 = 1.0;
        bc.q1 = std::f64::INFINITY;
        assert!(matches!(
            QuinticCurve::new(&bc),
            Err(TrajGenError::NonFiniteBoundary)
        ));
    }
}

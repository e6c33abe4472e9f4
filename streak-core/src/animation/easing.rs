//! Easing functions with the classic `(t, b, c, d)` signature: elapsed time,
//! begin value, total change and duration.

use std::f64::consts::TAU;

/// An easing curve.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    /// Constant speed.
    #[default]
    Linear,
    /// Quadratic acceleration.
    EaseIn,
    /// Quadratic deceleration.
    EaseOut,
    /// Quadratic acceleration then deceleration.
    EaseInOut,
    /// Quintic acceleration.
    StrongEaseIn,
    /// Quintic deceleration.
    StrongEaseOut,
    /// Quintic acceleration then deceleration.
    StrongEaseInOut,
    /// Pull back, then accelerate.
    BackEaseIn,
    /// Overshoot, then settle.
    BackEaseOut,
    /// Pull back and overshoot.
    BackEaseInOut,
    /// Growing oscillation.
    ElasticEaseIn {
        /// Oscillation amplitude; defaults to the change.
        amplitude: Option<f64>,
        /// Oscillation period; defaults to `0.3 · d`.
        period: Option<f64>,
    },
    /// Decaying oscillation.
    ElasticEaseOut {
        /// Oscillation amplitude; defaults to the change.
        amplitude: Option<f64>,
        /// Oscillation period; defaults to `0.3 · d`.
        period: Option<f64>,
    },
    /// Growing then decaying oscillation.
    ElasticEaseInOut {
        /// Oscillation amplitude; defaults to the change.
        amplitude: Option<f64>,
        /// Oscillation period; defaults to `0.45 · d`.
        period: Option<f64>,
    },
    /// Bounces at the start.
    BounceEaseIn,
    /// Bounces at the end.
    BounceEaseOut,
    /// Bounces at both ends.
    BounceEaseInOut,
}

const BACK: f64 = 1.70158;

impl Easing {
    /// Look up an easing by name (`"EaseInOut"`, `"BounceEaseOut"`, ...).
    /// Elastic curves get their default amplitude and period.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let (amplitude, period) = (None, None);
        Some(match name {
            "Linear" => Self::Linear,
            "EaseIn" => Self::EaseIn,
            "EaseOut" => Self::EaseOut,
            "EaseInOut" => Self::EaseInOut,
            "StrongEaseIn" => Self::StrongEaseIn,
            "StrongEaseOut" => Self::StrongEaseOut,
            "StrongEaseInOut" => Self::StrongEaseInOut,
            "BackEaseIn" => Self::BackEaseIn,
            "BackEaseOut" => Self::BackEaseOut,
            "BackEaseInOut" => Self::BackEaseInOut,
            "ElasticEaseIn" => Self::ElasticEaseIn { amplitude, period },
            "ElasticEaseOut" => Self::ElasticEaseOut { amplitude, period },
            "ElasticEaseInOut" => Self::ElasticEaseInOut { amplitude, period },
            "BounceEaseIn" => Self::BounceEaseIn,
            "BounceEaseOut" => Self::BounceEaseOut,
            "BounceEaseInOut" => Self::BounceEaseInOut,
            _ => return None,
        })
    }

    /// Value at time `t` of a change from `b` by `c` over duration `d`.
    #[must_use]
    pub fn ease(self, t: f64, b: f64, c: f64, d: f64) -> f64 {
        if d <= 0.0 {
            return b + c;
        }
        match self {
            Self::Linear => {
                if t >= d {
                    b + c
                } else {
                    c * t / d + b
                }
            }
            Self::EaseIn => {
                let t = t / d;
                c * t * t + b
            }
            Self::EaseOut => {
                let t = t / d;
                -c * t * (t - 2.0) + b
            }
            Self::EaseInOut => {
                let t = t / (d / 2.0);
                if t < 1.0 {
                    c / 2.0 * t * t + b
                } else {
                    let t = t - 1.0;
                    -c / 2.0 * (t * (t - 2.0) - 1.0) + b
                }
            }
            Self::StrongEaseIn => {
                let t = t / d;
                c * t.powi(5) + b
            }
            Self::StrongEaseOut => {
                let t = t / d - 1.0;
                c * (t.powi(5) + 1.0) + b
            }
            Self::StrongEaseInOut => {
                let t = t / (d / 2.0);
                if t < 1.0 {
                    c / 2.0 * t.powi(5) + b
                } else {
                    let t = t - 2.0;
                    c / 2.0 * (t.powi(5) + 2.0) + b
                }
            }
            Self::BackEaseIn => {
                let t = t / d;
                c * t * t * ((BACK + 1.0) * t - BACK) + b
            }
            Self::BackEaseOut => {
                let t = t / d - 1.0;
                c * (t * t * ((BACK + 1.0) * t + BACK) + 1.0) + b
            }
            Self::BackEaseInOut => {
                let s = BACK * 1.525;
                let t = t / (d / 2.0);
                if t < 1.0 {
                    c / 2.0 * (t * t * ((s + 1.0) * t - s)) + b
                } else {
                    let t = t - 2.0;
                    c / 2.0 * (t * t * ((s + 1.0) * t + s) + 2.0) + b
                }
            }
            Self::ElasticEaseIn { amplitude, period } => {
                elastic_in(t, b, c, d, amplitude, period.unwrap_or(d * 0.3))
            }
            Self::ElasticEaseOut { amplitude, period } => {
                elastic_out(t, b, c, d, amplitude, period.unwrap_or(d * 0.3))
            }
            Self::ElasticEaseInOut { amplitude, period } => {
                elastic_in_out(t, b, c, d, amplitude, period.unwrap_or(d * 0.45))
            }
            Self::BounceEaseIn => bounce_in(t, b, c, d),
            Self::BounceEaseOut => bounce_out(t, b, c, d),
            Self::BounceEaseInOut => {
                if t < d / 2.0 {
                    bounce_in(t * 2.0, 0.0, c, d) * 0.5 + b
                } else {
                    bounce_out(t * 2.0 - d, 0.0, c, d) * 0.5 + c * 0.5 + b
                }
            }
        }
    }
}

/// Amplitude and phase shift for the elastic curves.
fn elastic_shape(c: f64, amplitude: Option<f64>, period: f64) -> (f64, f64) {
    match amplitude {
        Some(a) if a >= c.abs() && a != 0.0 => (a, period / TAU * (c / a).asin()),
        _ => (c, period / 4.0),
    }
}

fn elastic_in(t: f64, b: f64, c: f64, d: f64, amplitude: Option<f64>, p: f64) -> f64 {
    if t == 0.0 {
        return b;
    }
    let t = t / d;
    if t == 1.0 {
        return b + c;
    }
    let (a, s) = elastic_shape(c, amplitude, p);
    let t = t - 1.0;
    -(a * 2f64.powf(10.0 * t) * ((t * d - s) * TAU / p).sin()) + b
}

fn elastic_out(t: f64, b: f64, c: f64, d: f64, amplitude: Option<f64>, p: f64) -> f64 {
    if t == 0.0 {
        return b;
    }
    let t = t / d;
    if t == 1.0 {
        return b + c;
    }
    let (a, s) = elastic_shape(c, amplitude, p);
    a * 2f64.powf(-10.0 * t) * ((t * d - s) * TAU / p).sin() + c + b
}

fn elastic_in_out(t: f64, b: f64, c: f64, d: f64, amplitude: Option<f64>, p: f64) -> f64 {
    if t == 0.0 {
        return b;
    }
    let t = t / (d / 2.0);
    if t == 2.0 {
        return b + c;
    }
    let (a, s) = elastic_shape(c, amplitude, p);
    let t = t - 1.0;
    let wave = ((t * d - s) * TAU / p).sin();
    if t < 0.0 {
        -0.5 * (a * 2f64.powf(10.0 * t) * wave) + b
    } else {
        a * 2f64.powf(-10.0 * t) * wave * 0.5 + c + b
    }
}

fn bounce_out(t: f64, b: f64, c: f64, d: f64) -> f64 {
    let t = t / d;
    if t < 1.0 / 2.75 {
        c * (7.5625 * t * t) + b
    } else if t < 2.0 / 2.75 {
        let t = t - 1.5 / 2.75;
        c * (7.5625 * t * t + 0.75) + b
    } else if t < 2.5 / 2.75 {
        let t = t - 2.25 / 2.75;
        c * (7.5625 * t * t + 0.9375) + b
    } else {
        let t = t - 2.625 / 2.75;
        c * (7.5625 * t * t + 0.984_375) + b
    }
}

fn bounce_in(t: f64, b: f64, c: f64, d: f64) -> f64 {
    c - bounce_out(d - t, 0.0, c, d) + b
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 16] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::StrongEaseIn,
        Easing::StrongEaseOut,
        Easing::StrongEaseInOut,
        Easing::BackEaseIn,
        Easing::BackEaseOut,
        Easing::BackEaseInOut,
        Easing::ElasticEaseIn {
            amplitude: None,
            period: None,
        },
        Easing::ElasticEaseOut {
            amplitude: None,
            period: None,
        },
        Easing::ElasticEaseInOut {
            amplitude: None,
            period: None,
        },
        Easing::BounceEaseIn,
        Easing::BounceEaseOut,
        Easing::BounceEaseInOut,
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            let start = easing.ease(0.0, 10.0, 5.0, 1000.0);
            let end = easing.ease(1000.0, 10.0, 5.0, 1000.0);
            assert!((start - 10.0).abs() < 1e-9, "{easing:?} start {start}");
            assert!((end - 15.0).abs() < 1e-9, "{easing:?} end {end}");
        }
    }

    #[test]
    fn test_linear_is_exact_past_the_end() {
        assert_eq!(Easing::Linear.ease(2000.0, 0.1, 0.2, 1000.0), 0.1 + 0.2);
        assert!((Easing::Linear.ease(250.0, 0.0, 8.0, 1000.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_in_out_midpoint() {
        let mid = Easing::EaseInOut.ease(500.0, 0.0, 1.0, 1000.0);
        assert!((mid - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_back_overshoots() {
        let early = Easing::BackEaseIn.ease(100.0, 0.0, 1.0, 1000.0);
        assert!(early < 0.0);
        let late = Easing::BackEaseOut.ease(900.0, 0.0, 1.0, 1000.0);
        assert!(late > 1.0);
    }

    #[test]
    fn test_bounce_stays_in_range() {
        for i in 0..=100 {
            let t = f64::from(i) * 10.0;
            let v = Easing::BounceEaseOut.ease(t, 0.0, 1.0, 1000.0);
            assert!((-1e-9..=1.0 + 1e-9).contains(&v));
        }
    }

    #[test]
    fn test_zero_duration_jumps_to_end() {
        assert_eq!(Easing::EaseIn.ease(0.0, 1.0, 2.0, 0.0), 3.0);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Easing::from_name("StrongEaseOut"), Some(Easing::StrongEaseOut));
        assert!(matches!(
            Easing::from_name("ElasticEaseInOut"),
            Some(Easing::ElasticEaseInOut { .. })
        ));
        assert_eq!(Easing::from_name("Wobble"), None);
    }
}

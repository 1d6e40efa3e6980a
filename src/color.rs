//! Continuous color scale used for choropleth fills.

use once_cell::sync::Lazy;

/// RGB channels in `0..=255` before rounding.
pub type Rgb = [f64; 3];

/// Maps `t` in `[0, 1]` to a color.
pub type Interpolator = fn(f64) -> Rgb;

// Nine-class sequential "Reds" scheme, light to dark.
const REDS: &str = "fff5f0fee0d2fcbba1fc9272fb6a4aef3b2ccb181da50f1567000d";

static REDS_STOPS: Lazy<Vec<Rgb>> = Lazy::new(|| parse_scheme(REDS));

fn parse_scheme(hex: &str) -> Vec<Rgb> {
    hex.as_bytes()
        .chunks(6)
        .filter_map(|chunk| {
            let s = std::str::from_utf8(chunk).ok()?;
            let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok().map(f64::from);
            Some([channel(0)?, channel(2)?, channel(4)?])
        })
        .collect()
}

fn basis(t1: f64, v0: f64, v1: f64, v2: f64, v3: f64) -> f64 {
    let t2 = t1 * t1;
    let t3 = t2 * t1;
    ((1.0 - 3.0 * t1 + 3.0 * t2 - t3) * v0
        + (4.0 - 6.0 * t2 + 3.0 * t3) * v1
        + (1.0 + 3.0 * t1 + 3.0 * t2 - 3.0 * t3) * v2
        + t3 * v3)
        / 6.0
}

/// Uniform cubic B-spline through `values`, clamped to its end points.
fn spline(values: &[f64], t: f64) -> f64 {
    let n = values.len() - 1;
    let (t, i) = if t <= 0.0 {
        (0.0, 0)
    } else if t >= 1.0 {
        (1.0, n - 1)
    } else {
        (t, (t * n as f64).floor() as usize)
    };
    let v1 = values[i];
    let v2 = values[i + 1];
    let v0 = if i > 0 { values[i - 1] } else { 2.0 * v1 - v2 };
    let v3 = if i < n - 1 { values[i + 2] } else { 2.0 * v2 - v1 };
    basis((t - i as f64 / n as f64) * n as f64, v0, v1, v2, v3)
}

pub fn interpolate_reds(t: f64) -> Rgb {
    let stops = &*REDS_STOPS;
    let mut out = [0.0; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let channel: Vec<f64> = stops.iter().map(|rgb| rgb[c]).collect();
        *slot = spline(&channel, t);
    }
    out
}

pub fn to_hex(rgb: Rgb) -> String {
    let byte = |v: f64| if v.is_finite() { v.round().clamp(0.0, 255.0) as u8 } else { 0 };
    format!("#{:02x}{:02x}{:02x}", byte(rgb[0]), byte(rgb[1]), byte(rgb[2]))
}

// Step boundaries for picking 1, 2, 5 or 10 times a power of ten.
const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = std::f64::consts::SQRT_2;

/// Round tick step for `count` ticks over `[start, stop]`. Negative values
/// encode the inverse of a sub-unit step.
pub fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    let step = (stop - start) / count.max(1) as f64;
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };
    if power >= 0.0 {
        factor * 10f64.powf(power)
    } else {
        -10f64.powf(-power) / factor
    }
}

/// Sequential scale from a numeric domain onto an interpolator.
#[derive(Debug, Clone, Copy)]
pub struct ColorScale {
    domain: [f64; 2],
    interpolate: Interpolator,
}

impl ColorScale {
    pub fn new(domain: [f64; 2], interpolate: Interpolator) -> Self {
        Self { domain, interpolate }
    }

    /// Reds scale over `[0, max]`.
    pub fn reds(max: f64) -> Self {
        Self::new([0.0, max], interpolate_reds)
    }

    pub fn domain(&self) -> [f64; 2] {
        self.domain
    }

    /// Extend the domain outward to round step boundaries.
    ///
    /// The domain is left untouched when it is degenerate or when the step
    /// does not settle within ten iterations.
    pub fn nice(mut self, count: usize) -> Self {
        let [mut start, mut stop] = self.domain;
        let reversed = stop < start;
        if reversed {
            std::mem::swap(&mut start, &mut stop);
        }
        let mut prestep = None;
        for _ in 0..10 {
            let step = tick_increment(start, stop, count);
            if !step.is_finite() || step == 0.0 {
                break;
            }
            if prestep == Some(step) {
                self.domain = if reversed { [stop, start] } else { [start, stop] };
                break;
            }
            if step > 0.0 {
                start = (start / step).floor() * step;
                stop = (stop / step).ceil() * step;
            } else {
                start = (start * step).ceil() / step;
                stop = (stop * step).floor() / step;
            }
            prestep = Some(step);
        }
        self
    }

    /// Hex color for `value`, or `None` when the value is not finite.
    pub fn color(&self, value: f64) -> Option<String> {
        if !value.is_finite() {
            return None;
        }
        let [x0, x1] = self.domain;
        let t = if x0 == x1 {
            0.5
        } else {
            ((value - x0) / (x1 - x0)).clamp(0.0, 1.0)
        };
        Some(to_hex((self.interpolate)(t)))
    }
}

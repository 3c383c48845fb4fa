//! Scaling helpers shared by the patterns.

use libm::{fabsf, powf};

/// Map `input` from `[original_min, original_max]` onto
/// `[new_begin, new_end]` along a logarithmic curve.
///
/// `curve` runs from -10 to 10; 0 is linear and positive values give more
/// weight to the high end of the output. The input is clamped into the
/// original range. `new_end` may be smaller than `new_begin` to invert the
/// mapping. An inverted original range yields 0.
pub fn fscale(
    original_min: f32,
    original_max: f32,
    new_begin: f32,
    new_end: f32,
    input: f32,
    curve: f32,
) -> f32 {
    if original_min > original_max {
        return 0.0;
    }

    let curve = powf(10.0, curve.clamp(-10.0, 10.0) * -0.1);
    let input = input.clamp(original_min, original_max);

    let normalized = (input - original_min) / (original_max - original_min);
    let shaped = powf(normalized, curve);

    if new_end > new_begin {
        shaped * (new_end - new_begin) + new_begin
    } else {
        new_begin - shaped * (new_begin - new_end)
    }
}

/// Linear map of `x` from `[in_min, in_max]` onto `[out_min, out_max]`,
/// without clamping.
#[inline]
pub fn fmap(x: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Integer linear map that truncates toward zero at every step, like the
/// Arduino `map()` it replaces.
#[inline]
pub fn map_range(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Map a sensation in `[-100, 100]` to a multiplicative factor.
///
/// 0 maps to 1, +100 to `max_factor` and -100 to `1 / max_factor`.
pub fn sensation_to_factor(max_factor: f32, sensation: f32, curve: f32) -> f32 {
    let sensation = sensation.clamp(-100.0, 100.0);
    if sensation == 0.0 {
        return 1.0;
    }

    let scaled = fscale(0.0, 100.0, 1.0, max_factor, fabsf(sensation), curve);
    if sensation > 0.0 {
        scaled
    } else {
        1.0 / scaled
    }
}

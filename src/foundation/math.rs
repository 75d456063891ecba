pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// `round(a + (b - a) * t)` per channel; exact at `t = 0` and `t = 1`.
pub(crate) fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let a = f32::from(a);
    let b = f32::from(b);
    (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
}

pub(crate) fn smoothstep(a: f32, b: f32, x: f32) -> f32 {
    if x <= a {
        return 0.0;
    }
    if x >= b {
        return 1.0;
    }
    let t = (x - a) / (b - a);
    (t * t * (3.0 - 2.0 * t)).clamp(0.0, 1.0)
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Premultiplied RGBA8 to straight `[0, 1]` floats.
pub(crate) fn unpremul_to_f32(px: [u8; 4]) -> [f32; 4] {
    let a = f32::from(px[3]) / 255.0;
    if a <= 0.0 {
        return [0.0, 0.0, 0.0, 0.0];
    }
    [
        (f32::from(px[0]) / 255.0 / a).min(1.0),
        (f32::from(px[1]) / 255.0 / a).min(1.0),
        (f32::from(px[2]) / 255.0 / a).min(1.0),
        a,
    ]
}

/// Straight `[0, 1]` floats to premultiplied RGBA8; non-finite channels become 0.
pub(crate) fn premul_from_f32(c: [f32; 4]) -> [u8; 4] {
    fn unit(x: f32) -> f32 {
        if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 }
    }
    let a = unit(c[3]);
    let to_u8 = |x: f32| (x * 255.0).round() as u8;
    [
        to_u8(unit(c[0]) * a),
        to_u8(unit(c[1]) * a),
        to_u8(unit(c[2]) * a),
        to_u8(a),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;

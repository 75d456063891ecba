use crate::composition::transition::WipeDir;
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::math::{lerp_u8, mul_div255_u8, smoothstep};

pub type PremulRgba8 = [u8; 4];

/// Source-over of premultiplied `src` onto premultiplied `dst`, scaled by `opacity`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Per-channel linear interpolation; returns `a` exactly at `t = 0` and `b` exactly at `t = 1`.
pub fn crossfade(a: PremulRgba8, b: PremulRgba8, t: f32) -> PremulRgba8 {
    let t = t.clamp(0.0, 1.0);
    [
        lerp_u8(a[0], b[0], t),
        lerp_u8(a[1], b[1], t),
        lerp_u8(a[2], b[2], t),
        lerp_u8(a[3], b[3], t),
    ]
}

fn check_len(name: &str, bufs: &[&[u8]]) -> MontageResult<()> {
    let len = bufs.first().map_or(0, |b| b.len());
    if bufs.iter().any(|b| b.len() != len) || !len.is_multiple_of(4) {
        return Err(MontageError::validation(format!(
            "{name} expects equal-length rgba8 buffers"
        )));
    }
    Ok(())
}

pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> MontageResult<()> {
    check_len("over_in_place", &[dst, src])?;
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Write `crossfade(a, b, t)` into `dst`.
pub fn crossfade_into(dst: &mut [u8], a: &[u8], b: &[u8], t: f32) -> MontageResult<()> {
    check_len("crossfade_into", &[dst, a, b])?;
    for ((d, a), b) in dst
        .chunks_exact_mut(4)
        .zip(a.chunks_exact(4))
        .zip(b.chunks_exact(4))
    {
        let out = crossfade([a[0], a[1], a[2], a[3]], [b[0], b[1], b[2], b[3]], t);
        d.copy_from_slice(&out);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug)]
pub struct WipeParams {
    pub width: u32,
    pub height: u32,
    pub t: f32,
    pub dir: WipeDir,
    pub soft_edge: f32,
}

/// Reveal `b` over `a` behind an edge travelling along `dir`.
pub fn wipe_into(dst: &mut [u8], a: &[u8], b: &[u8], params: WipeParams) -> MontageResult<()> {
    let WipeParams {
        width,
        height,
        t,
        dir,
        soft_edge,
    } = params;
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| MontageError::validation("wipe buffer size overflow"))?;

    if dst.len() != expected_len || a.len() != expected_len || b.len() != expected_len {
        return Err(MontageError::validation(
            "wipe_into expects buffers matching width*height*4",
        ));
    }

    let t = t.clamp(0.0, 1.0);
    let soft_edge = soft_edge.max(0.0);

    let axis_len = match dir {
        WipeDir::LeftToRight | WipeDir::RightToLeft => width as f32,
        WipeDir::TopToBottom | WipeDir::BottomToTop => height as f32,
    };
    let soft_px = soft_edge * axis_len;

    let edge = t * (axis_len + 2.0 * soft_px) - soft_px;
    let a_edge = edge - soft_px;
    let b_edge = edge + soft_px;

    for y in 0..height {
        for x in 0..width {
            let pos = match dir {
                WipeDir::LeftToRight => x as f32,
                WipeDir::RightToLeft => (width - 1 - x) as f32,
                WipeDir::TopToBottom => y as f32,
                WipeDir::BottomToTop => (height - 1 - y) as f32,
            };

            let m = if soft_px <= 0.0 {
                if pos < edge { 1.0 } else { 0.0 }
            } else {
                1.0 - smoothstep(a_edge, b_edge, pos)
            };

            let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
            let ap = [a[idx], a[idx + 1], a[idx + 2], a[idx + 3]];
            let bp = [b[idx], b[idx + 1], b[idx + 2], b[idx + 3]];
            dst[idx..idx + 4].copy_from_slice(&crossfade(ap, bp, m));
        }
    }

    Ok(())
}

/// Fade `a` into `color` over the first half of `t`, then `color` into `b`.
pub fn dip_into(
    dst: &mut [u8],
    a: &[u8],
    b: &[u8],
    color: PremulRgba8,
    t: f32,
) -> MontageResult<()> {
    check_len("dip_into", &[dst, a, b])?;
    let t = t.clamp(0.0, 1.0);
    for ((d, a), b) in dst
        .chunks_exact_mut(4)
        .zip(a.chunks_exact(4))
        .zip(b.chunks_exact(4))
    {
        let out = if t < 0.5 {
            crossfade([a[0], a[1], a[2], a[3]], color, t * 2.0)
        } else {
            crossfade(color, [b[0], b[1], b[2], b[3]], (t - 0.5) * 2.0)
        };
        d.copy_from_slice(&out);
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;

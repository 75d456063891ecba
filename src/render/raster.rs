use std::sync::Arc;

use kurbo::Shape;

use crate::assets::text::{FontFace, FontSet, TextBrushRgba8, TextLayoutEngine};
use crate::composition::clip::{ClipStyle, Fit};
use crate::foundation::core::{Resolution, Rgba8};
use crate::foundation::error::{MontageError, MontageResult};
use crate::render::frame::{Frame, PixelFormat};

/// Axis-aligned box in display pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Placement {
    pub(crate) x0: f64,
    pub(crate) y0: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
}

impl Placement {
    /// Box of `size` centered on the style's position (or the display center).
    pub(crate) fn centered(style: &ClipStyle, display: Resolution, size: (f64, f64)) -> Self {
        let (cx, cy) = style.position.map_or(
            (
                f64::from(display.width) * 0.5,
                f64::from(display.height) * 0.5,
            ),
            |p| p.to_pixels(display),
        );
        Self {
            x0: cx - size.0 * 0.5,
            y0: cy - size.1 * 0.5,
            width: size.0,
            height: size.1,
        }
    }

    fn rect(&self) -> kurbo::Rect {
        kurbo::Rect::new(self.x0, self.y0, self.x0 + self.width, self.y0 + self.height)
    }
}

/// Scale factors and top-left offset that place a `frame_w x frame_h` image into `bx`.
pub(crate) fn fit_image(fit: Fit, frame_w: f64, frame_h: f64, bx: Placement) -> (f64, f64, f64, f64) {
    let (sx, sy) = match fit {
        Fit::Stretch => (bx.width / frame_w, bx.height / frame_h),
        Fit::Contain => {
            let s = (bx.width / frame_w).min(bx.height / frame_h);
            (s, s)
        }
        Fit::Cover => {
            let s = (bx.width / frame_w).max(bx.height / frame_h);
            (s, s)
        }
    };
    let ox = bx.x0 + (bx.width - frame_w * sx) * 0.5;
    let oy = bx.y0 + (bx.height - frame_h * sy) * 0.5;
    (sx, sy, ox, oy)
}

/// Draws single clips into transparent display-sized layer buffers with `vello_cpu`.
pub(crate) struct Rasterizer {
    display: Resolution,
    width: u16,
    height: u16,
    ctx: Option<vello_cpu::RenderContext>,
    text: TextLayoutEngine,
    warned_missing_font: bool,
}

impl Rasterizer {
    pub(crate) fn new(display: Resolution) -> MontageResult<Self> {
        let width: u16 = display
            .width
            .try_into()
            .map_err(|_| MontageError::validation("display width exceeds u16"))?;
        let height: u16 = display
            .height
            .try_into()
            .map_err(|_| MontageError::validation("display height exceeds u16"))?;
        Ok(Self {
            display,
            width,
            height,
            ctx: None,
            text: TextLayoutEngine::new(),
            warned_missing_font: false,
        })
    }

    fn with_ctx(
        &mut self,
        f: impl FnOnce(&mut vello_cpu::RenderContext) -> MontageResult<()>,
    ) -> MontageResult<Frame> {
        let mut ctx = self
            .ctx
            .take()
            .unwrap_or_else(|| vello_cpu::RenderContext::new(self.width, self.height));
        ctx.reset();
        let drawn = f(&mut ctx);
        let out = drawn.map(|()| {
            let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
            pixmap.data_as_u8_slice().to_vec()
        });
        self.ctx = Some(ctx);
        Frame::new(
            self.display.width,
            self.display.height,
            PixelFormat::Rgba8Premul,
            out?,
        )
    }

    /// Place a decoded media frame according to the clip's size, position and fit.
    pub(crate) fn media(&mut self, frame: &Frame, style: &ClipStyle) -> MontageResult<Frame> {
        let size = style.size.map_or(
            (f64::from(self.display.width), f64::from(self.display.height)),
            |[w, h]| (w, h),
        );
        let bx = Placement::centered(style, self.display, size);
        let frame = if frame.format == PixelFormat::Rgba8Premul && frame.is_packed() {
            std::borrow::Cow::Borrowed(frame)
        } else {
            std::borrow::Cow::Owned(frame.clone().into_premultiplied())
        };

        let (fw, fh) = (f64::from(frame.width), f64::from(frame.height));
        let (sx, sy, ox, oy) = fit_image(style.fit, fw, fh, bx);
        if frame.resolution() == self.display && sx == 1.0 && sy == 1.0 && ox == 0.0 && oy == 0.0
        {
            return Ok(frame.into_owned());
        }

        // Visible part of the image in image space: the box, clipped to the image.
        let vis = kurbo::Rect::new(
            ((bx.x0 - ox) / sx).max(0.0),
            ((bx.y0 - oy) / sy).max(0.0),
            ((bx.x0 + bx.width - ox) / sx).min(fw),
            ((bx.y0 + bx.height - oy) / sy).min(fh),
        );
        if vis.width() <= 0.0 || vis.height() <= 0.0 {
            return Ok(Frame::transparent(self.display));
        }
        let paint = image_paint(&frame)?;
        self.with_ctx(|ctx| {
            ctx.set_transform(
                vello_cpu::kurbo::Affine::translate((ox, oy))
                    * vello_cpu::kurbo::Affine::scale_non_uniform(sx, sy),
            );
            ctx.set_paint(paint);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(vis.x0, vis.y0, vis.x1, vis.y1));
            Ok(())
        })
    }

    /// Fill the clip's box (the whole display by default) with `color`.
    pub(crate) fn solid(&mut self, color: Rgba8, style: &ClipStyle) -> MontageResult<Frame> {
        let size = style.size.map_or(
            (f64::from(self.display.width), f64::from(self.display.height)),
            |[w, h]| (w, h),
        );
        let bx = Placement::centered(style, self.display, size);
        self.with_ctx(|ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            fill_rounded(ctx, bx, style.corner_radii, color);
            Ok(())
        })
    }

    /// Shape and draw text with its optional rounded background.
    pub(crate) fn text(
        &mut self,
        text: &str,
        style: &ClipStyle,
        fonts: &FontSet,
    ) -> MontageResult<Frame> {
        self.text.retain_faces(fonts);
        let Some(face) = fonts.face(style.font_weight) else {
            if !self.warned_missing_font {
                tracing::warn!("no font installed, text clips render without glyphs");
                self.warned_missing_font = true;
            }
            return Ok(Frame::transparent(self.display));
        };
        self.draw_text(text, style, face)
    }

    fn draw_text(
        &mut self,
        text: &str,
        style: &ClipStyle,
        face: &FontFace,
    ) -> MontageResult<Frame> {
        let pad = style.padding;
        let wrap = style
            .word_wrap_width
            .map(|w| ((w - 2.0 * pad).max(1.0)) as f32);
        let shaped = self.text.shape(
            text,
            face,
            style.font_size as f32,
            TextBrushRgba8::from(style.color),
            wrap,
            style.text_align,
        )?;
        let text_w = f64::from(shaped.width);
        let text_h = f64::from(shaped.height);
        let size = style
            .size
            .map_or((text_w + 2.0 * pad, text_h + 2.0 * pad), |[w, h]| (w, h));
        let bx = Placement::centered(style, self.display, size);
        let block_x = bx.x0
            + pad
            + f64::from(crate::assets::text::align_offset(
                shaped.width,
                (bx.width - 2.0 * pad).max(0.0) as f32,
                style.text_align,
            ));
        let block_y = bx.y0 + pad;

        self.with_ctx(|ctx| {
            if let Some(bg) = style.background {
                ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
                fill_rounded(ctx, bx, style.corner_radii, bg);
            }
            for (line, offset) in shaped.layout.lines().zip(shaped.line_offsets.iter()) {
                ctx.set_transform(vello_cpu::kurbo::Affine::translate((
                    block_x + f64::from(*offset),
                    block_y,
                )));
                for item in line.items() {
                    let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                        continue;
                    };
                    let brush = run.style().brush;
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        brush.r, brush.g, brush.b, brush.a,
                    ));
                    let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    ctx.glyph_run(&shaped.font)
                        .font_size(run.run().font_size())
                        .fill_glyphs(glyphs);
                }
            }
            Ok(())
        })
    }
}

fn fill_rounded(ctx: &mut vello_cpu::RenderContext, bx: Placement, radii: [f64; 4], color: Rgba8) {
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color.r, color.g, color.b, color.a,
    ));
    if radii.iter().all(|r| *r <= 0.0) {
        let r = bx.rect();
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1));
        return;
    }
    let rounded = kurbo::RoundedRect::from_rect(
        bx.rect(),
        kurbo::RoundedRectRadii::new(radii[0], radii[1], radii[2], radii[3]),
    );
    ctx.fill_path(&to_cpu_path(rounded.path_elements(0.1)));
}

fn to_cpu_path(elements: impl Iterator<Item = kurbo::PathEl>) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for el in elements {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_paint(frame: &Frame) -> MontageResult<vello_cpu::Image> {
    let w: u16 = frame
        .width
        .try_into()
        .map_err(|_| MontageError::validation("frame width exceeds u16"))?;
    let h: u16 = frame
        .height
        .try_into()
        .map_err(|_| MontageError::validation("frame height exceeds u16"))?;
    // Pixmap stores PremulRgba8; the frame is already premultiplied and packed.
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = frame
        .data
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::composition::clip::{FontWeight, TextAlign};
use crate::foundation::core::Rgba8;
use crate::foundation::error::{MontageError, MontageResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl From<Rgba8> for TextBrushRgba8 {
    fn from(c: Rgba8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}

static NEXT_FACE_ID: AtomicU64 = AtomicU64::new(1);

/// Font bytes with an identity that is never reused, even after the face is dropped.
#[derive(Clone)]
pub struct FontFace {
    id: u64,
    bytes: Arc<Vec<u8>>,
}

impl FontFace {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            id: NEXT_FACE_ID.fetch_add(1, Ordering::Relaxed),
            bytes: Arc::new(bytes),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFace")
            .field("id", &self.id)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Font faces available to text clips, one per supported weight.
#[derive(Clone, Debug, Default)]
pub struct FontSet {
    regular: Option<FontFace>,
    bold: Option<FontFace>,
}

impl FontSet {
    /// Install `bytes` as the face used for `weight`.
    pub fn set(&mut self, weight: FontWeight, bytes: Vec<u8>) {
        self.set_face(weight, FontFace::new(bytes));
    }

    pub fn set_face(&mut self, weight: FontWeight, face: FontFace) {
        match weight {
            FontWeight::Normal => self.regular = Some(face),
            FontWeight::Bold => self.bold = Some(face),
        }
    }

    /// Face for `weight`, falling back to the other weight when only one is installed.
    pub fn face(&self, weight: FontWeight) -> Option<&FontFace> {
        let (preferred, other) = match weight {
            FontWeight::Normal => (&self.regular, &self.bold),
            FontWeight::Bold => (&self.bold, &self.regular),
        };
        preferred.as_ref().or(other.as_ref())
    }

    /// `true` when no face is installed.
    pub fn is_empty(&self) -> bool {
        self.regular.is_none() && self.bold.is_none()
    }

    fn contains_id(&self, id: u64) -> bool {
        [&self.regular, &self.bold]
            .into_iter()
            .flatten()
            .any(|face| face.id == id)
    }
}

/// Laid-out text ready for rasterization.
pub(crate) struct ShapedText {
    pub(crate) layout: parley::Layout<TextBrushRgba8>,
    pub(crate) font: vello_cpu::peniko::FontData,
    /// Horizontal offset of each line inside the widest line, after alignment.
    pub(crate) line_offsets: Vec<f32>,
    /// Width of the widest line.
    pub(crate) width: f32,
    pub(crate) height: f32,
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    // Keyed by `FontFace::id`.
    faces: HashMap<u64, RegisteredFace>,
}

#[derive(Clone)]
struct RegisteredFace {
    family: String,
    font: vello_cpu::peniko::FontData,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            faces: HashMap::new(),
        }
    }

    /// Forget faces that are no longer in `fonts`.
    pub(crate) fn retain_faces(&mut self, fonts: &FontSet) {
        if self.faces.keys().all(|id| fonts.contains_id(*id)) {
            return;
        }
        // fontique cannot unregister fonts; live faces are registered again on next use.
        self.font_ctx = parley::FontContext::default();
        self.faces.clear();
    }

    pub(crate) fn cached_faces(&self) -> usize {
        self.faces.len()
    }

    fn face_for(&mut self, face: &FontFace) -> MontageResult<RegisteredFace> {
        if let Some(registered) = self.faces.get(&face.id) {
            return Ok(registered.clone());
        }
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::new(face.bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            MontageError::validation("no font families registered from font bytes")
        })?;
        let family = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| MontageError::validation("registered font family has no name"))?
            .to_string();
        let font =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::new(face.bytes.clone()), 0);
        let registered = RegisteredFace { family, font };
        self.faces.insert(face.id, registered.clone());
        Ok(registered)
    }

    /// Shape `text`, wrap it at `max_width_px` and compute per-line alignment offsets.
    pub(crate) fn shape(
        &mut self,
        text: &str,
        face: &FontFace,
        size_px: f32,
        brush: TextBrushRgba8,
        max_width_px: Option<f32>,
        align: TextAlign,
    ) -> MontageResult<ShapedText> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(MontageError::validation(
                "text font_size must be finite and > 0",
            ));
        }
        let face = self.face_for(face)?;

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(face.family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(max_width_px);
        layout.align(
            max_width_px,
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );

        let line_widths: Vec<f32> = layout
            .lines()
            .map(|line| {
                line.items()
                    .filter_map(|item| match item {
                        parley::layout::PositionedLayoutItem::GlyphRun(run) => {
                            Some(run.offset() + run.advance())
                        }
                        _ => None,
                    })
                    .fold(0.0f32, f32::max)
            })
            .collect();
        let width = line_widths.iter().copied().fold(0.0f32, f32::max);
        let line_offsets = line_widths
            .iter()
            .map(|&w| align_offset(w, width, align))
            .collect();
        let height = layout.height();

        Ok(ShapedText {
            layout,
            font: face.font,
            line_offsets,
            width,
            height,
        })
    }
}

/// Offset of a line of `line_width` inside a box of `box_width`.
pub(crate) fn align_offset(line_width: f32, box_width: f32, align: TextAlign) -> f32 {
    let free = (box_width - line_width).max(0.0);
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => free / 2.0,
        TextAlign::Right => free,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;

use crate::render::frame::Frame;

/// Receiver of rendered frames (a window, a texture upload, an encoder).
///
/// Frames are display-sized premultiplied RGBA8. `present` runs on the playback thread, so
/// implementations should hand the pixels off quickly.
pub trait DisplaySurface: Send {
    fn present(&mut self, frame: &Frame);
}

/// Keeps the most recent frame and counts presents.
#[derive(Debug, Default)]
pub struct MemorySurface {
    last: Option<Frame>,
    presented: u64,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last.as_ref()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl DisplaySurface for MemorySurface {
    fn present(&mut self, frame: &Frame) {
        self.presented += 1;
        match &mut self.last {
            Some(last) if last.data.len() == frame.data.len() => {
                last.data.copy_from_slice(&frame.data);
                last.width = frame.width;
                last.height = frame.height;
                last.stride = frame.stride;
                last.format = frame.format;
            }
            _ => self.last = Some(frame.clone()),
        }
    }
}

impl<F> DisplaySurface for F
where
    F: FnMut(&Frame) + Send,
{
    fn present(&mut self, frame: &Frame) {
        self(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;

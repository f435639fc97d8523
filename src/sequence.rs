use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{assets::DecodedImage, foundation::core::CanvasSize};

/// Identity of a frame's decoded resource. Issued once per decode, never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameHandle(pub u64);

impl FrameHandle {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Called exactly once for every frame handle that leaves a [`Sequence`].
pub trait ReleaseHook: Send {
    fn release(&mut self, handle: FrameHandle);
}

impl<F> ReleaseHook for F
where
    F: FnMut(FrameHandle) + Send,
{
    fn release(&mut self, handle: FrameHandle) {
        self(handle)
    }
}

/// Default hook: the raster is freed when the frame drops; just trace it.
#[derive(Debug, Default)]
pub struct TraceRelease;

impl ReleaseHook for TraceRelease {
    fn release(&mut self, handle: FrameHandle) {
        tracing::trace!(handle = handle.0, "released frame resource");
    }
}

#[derive(Clone, Debug)]
pub struct Frame {
    handle: FrameHandle,
    name: String,
    order: u64,
    image: Arc<image::RgbaImage>,
}

impl Frame {
    pub fn handle(&self) -> FrameHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in insertion order across the lifetime of the owning sequence.
    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn image(&self) -> &image::RgbaImage {
        &self.image
    }

    pub fn natural_size(&self) -> CanvasSize {
        CanvasSize::new(self.image.width(), self.image.height())
    }
}

/// Ordered frames plus the current-frame cursor.
pub struct Sequence {
    frames: Vec<Frame>,
    current: usize,
    next_order: u64,
    release: Box<dyn ReleaseHook>,
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("frames", &self.frames.len())
            .field("current", &self.current)
            .finish()
    }
}

impl Sequence {
    pub fn new() -> Self {
        Self::with_release_hook(TraceRelease)
    }

    pub fn with_release_hook(hook: impl ReleaseHook + 'static) -> Self {
        Self {
            frames: Vec::new(),
            current: 0,
            next_order: 0,
            release: Box::new(hook),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.get(self.current)
    }

    /// Append decoded images in order, returning the handles issued to them.
    pub fn append(&mut self, images: impl IntoIterator<Item = DecodedImage>) -> Vec<FrameHandle> {
        let mut handles = Vec::new();
        for img in images {
            let frame = Frame {
                handle: FrameHandle::next(),
                name: img.name,
                order: self.next_order,
                image: img.rgba,
            };
            self.next_order += 1;
            handles.push(frame.handle);
            self.frames.push(frame);
        }
        tracing::debug!(added = handles.len(), total = self.frames.len(), "frames appended");
        handles
    }

    /// Remove the frame at `index` and release its resource.
    ///
    /// Out-of-range indices are a no-op and release nothing.
    pub fn remove(&mut self, index: usize) -> Option<FrameHandle> {
        if index >= self.frames.len() {
            return None;
        }
        let frame = self.frames.remove(index);
        let handle = frame.handle;
        drop(frame);
        self.release.release(handle);

        if self.frames.is_empty() {
            self.current = 0;
        } else if index < self.current || self.current >= self.frames.len() {
            self.current = self.current.saturating_sub(1).min(self.frames.len() - 1);
        }
        Some(handle)
    }

    /// Remove every frame, releasing each handle once.
    pub fn clear(&mut self) {
        for frame in std::mem::take(&mut self.frames) {
            let handle = frame.handle;
            drop(frame);
            self.release.release(handle);
        }
        self.current = 0;
    }

    /// Move the cursor; returns false when `index` is out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.frames.len() {
            return false;
        }
        self.current = index;
        true
    }

    pub fn step_forward(&mut self) {
        if !self.frames.is_empty() {
            self.current = (self.current + 1) % self.frames.len();
        }
    }

    pub fn step_back(&mut self) {
        if !self.frames.is_empty() {
            self.current = self
                .current
                .checked_sub(1)
                .unwrap_or(self.frames.len() - 1);
        }
    }
}

impl Drop for Sequence {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn img(name: &str) -> DecodedImage {
        DecodedImage::new(name, image::RgbaImage::new(2, 2))
    }

    fn recording() -> (Sequence, Arc<Mutex<Vec<FrameHandle>>>) {
        let released = Arc::new(Mutex::new(Vec::new()));
        let sink = released.clone();
        let seq = Sequence::with_release_hook(move |h: FrameHandle| sink.lock().unwrap().push(h));
        (seq, released)
    }

    #[test]
    fn append_keeps_insertion_order() {
        let mut seq = Sequence::new();
        seq.append([img("a"), img("b")]);
        seq.append([img("c")]);
        let names: Vec<_> = seq.frames().iter().map(Frame::name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        let orders: Vec<_> = seq.frames().iter().map(Frame::order).collect();
        assert_eq!(orders, [0, 1, 2]);
    }

    #[test]
    fn remove_releases_once_and_reclamps_cursor() {
        let (mut seq, released) = recording();
        let handles = seq.append([img("a"), img("b"), img("c")]);
        assert!(seq.select(2));

        assert_eq!(seq.remove(2), Some(handles[2]));
        assert_eq!(seq.current_index(), 1);
        assert_eq!(seq.remove(2), None);
        assert_eq!(released.lock().unwrap().as_slice(), &[handles[2]]);
    }

    #[test]
    fn removing_before_cursor_keeps_same_frame_selected() {
        let mut seq = Sequence::new();
        seq.append([img("a"), img("b"), img("c")]);
        seq.select(2);
        seq.remove(0);
        assert_eq!(seq.current().unwrap().name(), "c");
    }

    #[test]
    fn removing_last_frame_resets_cursor() {
        let mut seq = Sequence::new();
        seq.append([img("a")]);
        seq.remove(0);
        assert!(seq.is_empty());
        assert_eq!(seq.current_index(), 0);
        assert!(seq.current().is_none());
    }

    #[test]
    fn clear_and_drop_release_everything_exactly_once() {
        let (mut seq, released) = recording();
        let first = seq.append([img("a"), img("b")]);
        seq.clear();
        seq.clear();
        let second = seq.append([img("c")]);
        drop(seq);

        let got = released.lock().unwrap().clone();
        assert_eq!(got, [first[0], first[1], second[0]]);
    }

    #[test]
    fn stepping_wraps() {
        let mut seq = Sequence::new();
        seq.append([img("a"), img("b")]);
        seq.step_back();
        assert_eq!(seq.current_index(), 1);
        seq.step_forward();
        assert_eq!(seq.current_index(), 0);
    }
}

use std::collections::VecDeque;
use std::convert::Infallible;

pub const DEFAULT_FALLBACK_FPS: f64 = 30.0;
pub const DEFAULT_MAX_FPS: f64 = 120.0;

/// Decoded frames of one video, in decode order.
pub trait FrameSource {
    type Frame;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Frame rate from container metadata; may be missing or nonsense.
    fn frame_rate(&self) -> Option<f64>;

    /// `Ok(None)` marks the normal end of stream.
    fn read(&mut self) -> Result<Option<Self::Frame>, Self::Error>;

    fn release(&mut self) {}
}

/// Encoder for annotated frames. `init` is called once, before the first
/// `write`; frames are written in submission order.
pub trait FrameSink<F> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn init(&mut self, width: u32, height: u32, fps: f64) -> Result<(), Self::Error>;

    fn write(&mut self, frame: &F) -> Result<(), Self::Error>;

    fn release(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    type Frame = S::Frame;
    type Error = S::Error;

    #[inline]
    fn frame_rate(&self) -> Option<f64> {
        (**self).frame_rate()
    }

    #[inline]
    fn read(&mut self) -> Result<Option<Self::Frame>, Self::Error> {
        (**self).read()
    }

    #[inline]
    fn release(&mut self) {
        (**self).release()
    }
}

impl<F, K: FrameSink<F> + ?Sized> FrameSink<F> for &mut K {
    type Error = K::Error;

    #[inline]
    fn init(&mut self, width: u32, height: u32, fps: f64) -> Result<(), Self::Error> {
        (**self).init(width, height, fps)
    }

    #[inline]
    fn write(&mut self, frame: &F) -> Result<(), Self::Error> {
        (**self).write(frame)
    }

    #[inline]
    fn release(&mut self) {
        (**self).release()
    }
}

/// Reported rate if it lies in `(0, max_fps]`, otherwise `fallback`.
#[inline]
pub fn resolve_fps(reported: Option<f64>, max_fps: f64, fallback: f64) -> f64 {
    match reported {
        Some(fps) if fps.is_finite() && fps > 0.0 && fps <= max_fps => fps,
        _ => fallback,
    }
}

/// Source over frames that are already decoded.
#[derive(Debug, Clone)]
pub struct MemorySource<F> {
    frames: VecDeque<F>,
    fps: Option<f64>,
    released: bool,
}

impl<F> MemorySource<F> {
    pub fn new<I: IntoIterator<Item = F>>(frames: I, fps: Option<f64>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            fps,
            released: false,
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<F> FrameSource for MemorySource<F> {
    type Frame = F;
    type Error = Infallible;

    #[inline]
    fn frame_rate(&self) -> Option<f64> {
        self.fps
    }

    #[inline]
    fn read(&mut self) -> Result<Option<F>, Self::Error> {
        Ok(self.frames.pop_front())
    }

    fn release(&mut self) {
        self.frames.clear();
        self.released = true;
    }
}

/// Sink collecting annotated frames in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink<F> {
    pub params: Option<(u32, u32, f64)>,
    pub frames: Vec<F>,
    pub released: bool,
}

impl<F> MemorySink<F> {
    pub fn new() -> Self {
        Self {
            params: None,
            frames: Vec::new(),
            released: false,
        }
    }
}

impl<F: Clone> FrameSink<F> for MemorySink<F> {
    type Error = Infallible;

    fn init(&mut self, width: u32, height: u32, fps: f64) -> Result<(), Self::Error> {
        self.params = Some((width, height, fps));
        Ok(())
    }

    fn write(&mut self, frame: &F) -> Result<(), Self::Error> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
    }
}

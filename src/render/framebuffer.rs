//! Frame buffers and the draw-lock discipline around them.
//!
//! [`FrameBuffers`] owns the color and depth planes plus their dimensions.
//! [`FrameStore`] wraps them in a single mutex shared between the render
//! side and the window's blit/resize side, with a `draw_locked` flag that
//! makes render-side re-locking a logged no-op instead of a deadlock.
//!
//! The depth buffer clears to 1.0 and a write must be strictly closer than
//! what is stored, so an equal-depth rewrite keeps the first pixel.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::warn;

use crate::color::Color;

/// Outcome of a single pixel write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelWrite {
    Success,
    /// The coordinate lies outside the buffer.
    OutOfBounds,
    /// The depth value is outside [0, 1] or not strictly closer than the
    /// stored depth.
    DepthRejected,
}

pub struct FrameBuffers {
    color: Vec<Color>,
    depth: Vec<f32>,
    width: u32,
    height: u32,
}

impl FrameBuffers {
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width * height) as usize;
        Self {
            color: vec![Color::BLACK; size],
            depth: vec![1.0; size],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resets the color plane to black and the depth plane to 1.0.
    pub fn clear(&mut self) {
        self.color.fill(Color::BLACK);
        self.depth.fill(1.0);
    }

    /// Reallocates both planes for new dimensions.
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = (width * height) as usize;
        self.color = vec![Color::BLACK; size];
        self.depth = vec![1.0; size];
        self.width = width;
        self.height = height;
    }

    /// Writes one pixel with bounds and depth tests.
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color, depth: f32) -> PixelWrite {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return PixelWrite::OutOfBounds;
        }
        if !(0.0..=1.0).contains(&depth) {
            return PixelWrite::DepthRejected;
        }
        let idx = (y as u32 * self.width + x as u32) as usize;
        if depth >= self.depth[idx] {
            return PixelWrite::DepthRejected;
        }
        self.color[idx] = color;
        self.depth[idx] = depth;
        PixelWrite::Success
    }

    /// The color at (x, y), or None when out of bounds.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(x, y).map(|idx| self.color[idx])
    }

    /// The stored depth at (x, y), or None when out of bounds.
    #[inline]
    pub fn depth_at(&self, x: i32, y: i32) -> Option<f32> {
        self.index(x, y).map(|idx| self.depth[idx])
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            Some((y as u32 * self.width + x as u32) as usize)
        } else {
            None
        }
    }

    /// The color plane as raw ARGB8888 bytes for the streaming texture.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: Color is a repr(transparent) u32, so the Vec's allocation
        // is a contiguous run of len * 4 initialized bytes.
        unsafe {
            std::slice::from_raw_parts(self.color.as_ptr() as *const u8, self.color.len() * 4)
        }
    }
}

/// Shared access to the frame buffers: one mutex serializing the render
/// loop against the blit and resize paths.
pub struct FrameStore {
    inner: Mutex<FrameBuffers>,
    draw_locked: AtomicBool,
}

impl FrameStore {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Mutex::new(FrameBuffers::new(width, height)),
            draw_locked: AtomicBool::new(false),
        }
    }

    /// Takes the buffer lock for a frame of drawing. Returns None and logs
    /// a warning when the draw lock is already held; releasing happens when
    /// the guard drops.
    pub fn draw_lock(&self) -> Option<DrawGuard<'_>> {
        if self.draw_locked.swap(true, Ordering::Acquire) {
            warn!("draw lock requested while already held");
            return None;
        }
        Some(DrawGuard {
            guard: self.lock_inner(),
            flag: &self.draw_locked,
        })
    }

    pub fn is_draw_locked(&self) -> bool {
        self.draw_locked.load(Ordering::Acquire)
    }

    /// Clears both planes. Blocks while a draw guard is held.
    pub fn clear(&self) {
        self.lock_inner().clear();
    }

    /// Reallocates both planes. Blocks while a draw guard is held.
    pub fn resize(&self, width: u32, height: u32) {
        self.lock_inner().resize(width, height);
    }

    /// Runs a closure with shared access to the buffers, e.g. for the blit.
    pub fn with_frame<R>(&self, f: impl FnOnce(&FrameBuffers) -> R) -> R {
        f(&self.lock_inner())
    }

    fn lock_inner(&self) -> MutexGuard<'_, FrameBuffers> {
        // A poisoned mutex only means another thread panicked mid-frame;
        // the buffers themselves are always structurally valid.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Exclusive access to the frame buffers for the duration of a draw.
pub struct DrawGuard<'a> {
    guard: MutexGuard<'a, FrameBuffers>,
    flag: &'a AtomicBool,
}

impl Deref for DrawGuard<'_> {
    type Target = FrameBuffers;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for DrawGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl Drop for DrawGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

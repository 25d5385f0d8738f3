//! SDL2 window management: presenting the frame buffers, latching key
//! presses for the render loop, and frame-rate bookkeeping.

use std::path::Path;
use std::time::{Duration, Instant};

use log::info;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::rect::Rect;

use crate::color::Color;
use crate::render::framebuffer::FrameStore;

pub const WINDOW_WIDTH: u32 = 512;
pub const WINDOW_HEIGHT: u32 = 512;

/// One boolean per interesting key, set by the event pump and cleared by
/// whoever consumes the press. Losing a press to a frame boundary is
/// acceptable.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyLatches {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub w: bool,
    pub a: bool,
    pub s: bool,
    pub d: bool,
    pub z: bool,
    pub c: bool,
    pub shift: bool,
    pub tab: bool,
    pub screenshot: bool,
}

pub struct Window {
    canvas: sdl2::render::Canvas<sdl2::video::Window>,
    texture_creator: Box<sdl2::render::TextureCreator<sdl2::video::WindowContext>>,
    texture: sdl2::render::Texture<'static>,
    event_pump: sdl2::EventPump,
    frames: FrameStore,
    keys: KeyLatches,
    alive: bool,
    resize_pending: Option<(u32, u32)>,
    width: u32,
    height: u32,
    frame_start: Instant,
    fps_frames: u32,
    fps_since: Instant,
}

impl Window {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self, String> {
        let sdl_context = sdl2::init()?;
        let video_subsystem = sdl_context.video()?;

        let window = video_subsystem
            .window(title, width, height)
            .position_centered()
            .resizable()
            .build()
            .map_err(|e| e.to_string())?;

        let canvas = window.into_canvas().build().map_err(|e| e.to_string())?;
        let texture_creator = Box::new(canvas.texture_creator());
        let event_pump = sdl_context.event_pump()?;

        // SAFETY: texture_creator is heap-allocated and lives as long as
        // Window. We ensure texture is dropped before texture_creator by
        // struct field order.
        let texture_creator_ref: &'static sdl2::render::TextureCreator<sdl2::video::WindowContext> =
            unsafe { &*(texture_creator.as_ref() as *const _) };
        let texture = texture_creator_ref
            .create_texture_streaming(PixelFormatEnum::ARGB8888, width, height)
            .map_err(|e| e.to_string())?;

        Ok(Self {
            canvas,
            texture_creator,
            texture,
            event_pump,
            frames: FrameStore::new(width, height),
            keys: KeyLatches::default(),
            alive: true,
            resize_pending: None,
            width,
            height,
            frame_start: Instant::now(),
            fps_frames: 0,
            fps_since: Instant::now(),
        })
    }

    /// False once the window has been closed.
    pub fn alive(&self) -> bool {
        self.alive
    }

    pub fn keys_mut(&mut self) -> &mut KeyLatches {
        &mut self.keys
    }

    pub fn frames(&self) -> &FrameStore {
        &self.frames
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Drains pending events into the key latches, recording quit and
    /// resize requests.
    pub fn poll_events(&mut self) {
        for event in self.event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => self.alive = false,
                Event::Window {
                    win_event: sdl2::event::WindowEvent::Resized(w, h),
                    ..
                } => self.resize_pending = Some((w as u32, h as u32)),
                Event::KeyDown {
                    keycode: Some(keycode),
                    ..
                } => match keycode {
                    Keycode::Up => self.keys.up = true,
                    Keycode::Down => self.keys.down = true,
                    Keycode::Left => self.keys.left = true,
                    Keycode::Right => self.keys.right = true,
                    Keycode::W => self.keys.w = true,
                    Keycode::A => self.keys.a = true,
                    Keycode::S => self.keys.s = true,
                    Keycode::D => self.keys.d = true,
                    Keycode::Z => self.keys.z = true,
                    Keycode::C => self.keys.c = true,
                    Keycode::LShift | Keycode::RShift => self.keys.shift = true,
                    Keycode::Tab => self.keys.tab = true,
                    Keycode::P => self.keys.screenshot = true,
                    _ => {}
                },
                _ => {}
            }
        }
    }

    /// Applies a pending resize: reallocates the frame buffers and the
    /// streaming texture. Returns the new size when one was applied.
    pub fn take_resize(&mut self) -> Result<Option<(u32, u32)>, String> {
        let Some((width, height)) = self.resize_pending.take() else {
            return Ok(None);
        };
        self.frames.resize(width, height);
        self.width = width;
        self.height = height;

        // SAFETY: same as in new(), texture_creator outlives texture.
        let texture_creator_ref: &'static sdl2::render::TextureCreator<sdl2::video::WindowContext> =
            unsafe { &*(self.texture_creator.as_ref() as *const _) };
        self.texture = texture_creator_ref
            .create_texture_streaming(PixelFormatEnum::ARGB8888, width, height)
            .map_err(|e| e.to_string())?;
        Ok(Some((width, height)))
    }

    /// Clears both frame buffer planes for the next frame.
    pub fn clear(&self) {
        self.frames.clear();
    }

    /// Uploads the color buffer into the streaming texture and presents it.
    pub fn present(&mut self) -> Result<(), String> {
        let texture = &mut self.texture;
        let pitch = (self.width * 4) as usize;
        self.frames
            .with_frame(|frame| texture.update(None, frame.as_bytes(), pitch))
            .map_err(|e| e.to_string())?;

        self.canvas.clear();
        self.canvas.copy(
            &self.texture,
            None,
            Some(Rect::new(0, 0, self.width, self.height)),
        )?;
        self.canvas.present();
        Ok(())
    }

    /// Marks the start of a frame for the frame-rate cap.
    pub fn sync_begin(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Sleeps away whatever remains of the frame interval when a cap is
    /// set (0 leaves the rate uncapped), and logs the frame rate once per
    /// second when asked.
    pub fn sync_end(&mut self, fps_cap: u32, print_fps: bool) {
        if fps_cap != 0 {
            let target = Duration::from_secs_f64(1.0 / fps_cap as f64);
            let elapsed = self.frame_start.elapsed();
            if elapsed < target {
                std::thread::sleep(target - elapsed);
            }
        }

        if print_fps {
            self.fps_frames += 1;
            let since = self.fps_since.elapsed();
            if since.as_secs() >= 1 {
                info!("fps: {:.1}", self.fps_frames as f64 / since.as_secs_f64());
                self.fps_frames = 0;
                self.fps_since = Instant::now();
            }
        }
    }

    /// Saves the current frame as a PNG.
    pub fn save_frame(&self, path: &Path) -> Result<(), String> {
        self.frames.with_frame(|frame| {
            let mut img = image::ImageBuffer::new(frame.width(), frame.height());
            for y in 0..frame.height() {
                for x in 0..frame.width() {
                    let c = frame.pixel(x as i32, y as i32).unwrap_or(Color::BLACK);
                    img.put_pixel(x, y, image::Rgba([c.r(), c.g(), c.b(), c.a()]));
                }
            }
            img.save(path).map_err(|e| e.to_string())
        })
    }
}

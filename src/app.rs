//! The per-frame application loop tying the scene to the window.

use std::path::Path;
use std::time::Instant;

use log::{error, info, warn};

use crate::math::vec3::Vec3;
use crate::scene::Scene;
use crate::window::Window;

pub struct App {
    window: Window,
    scene: Scene,
    /// Config position of each model; the animation bounces around these.
    base_positions: Vec<Vec3>,
    start: Instant,
    prev: Instant,
    pub animate: bool,
    /// Frames per second cap; 0 leaves the rate uncapped.
    pub fps_cap: u32,
    pub print_fps: bool,
}

impl App {
    pub fn new(window: Window, scene: Scene, base_positions: Vec<Vec3>) -> Self {
        let now = Instant::now();
        Self {
            window,
            scene,
            base_positions,
            start: now,
            prev: now,
            animate: true,
            fps_cap: 0,
            print_fps: true,
        }
    }

    /// Runs the frame loop until the window closes. Returns the process
    /// exit code: 0 for a clean close, -1 after a fatal window error.
    pub fn run(&mut self) -> i32 {
        while self.window.alive() {
            self.window.sync_begin();
            self.window.clear();
            self.window.poll_events();
            self.scene.process_inputs(self.window.keys_mut());

            if std::mem::take(&mut self.window.keys_mut().screenshot) {
                match self.window.save_frame(Path::new("frame.png")) {
                    Ok(()) => info!("saved frame.png"),
                    Err(e) => warn!("failed to save frame: {}", e),
                }
            }

            if self.animate {
                self.step_animation();
            }

            match self.window.take_resize() {
                Ok(Some((width, height))) => {
                    self.scene.set_aspect(height as f32 / width as f32);
                }
                Ok(None) => {}
                Err(e) => {
                    error!("resize failed: {}", e);
                    return -1;
                }
            }

            match self.window.frames().draw_lock() {
                Some(mut frame) => self.scene.draw(&mut frame),
                None => warn!("skipping frame, buffers already locked"),
            }

            if let Err(e) = self.window.present() {
                error!("present failed: {}", e);
                return -1;
            }

            self.window.sync_end(self.fps_cap, self.print_fps);
        }
        0
    }

    /// Bounces each model on its y axis and spins it at one radian per
    /// second of frame time.
    fn step_animation(&mut self) {
        let now = Instant::now();
        let dt = (now - self.prev).as_secs_f32();
        self.prev = now;
        let elapsed = (now - self.start).as_secs_f32();

        for (i, base) in self.base_positions.iter().enumerate() {
            let mut pos = *base;
            pos.y = elapsed.sin();
            self.scene.set_pos(i, pos);
            self.scene.add_yaw(i, dt);
        }
    }
}

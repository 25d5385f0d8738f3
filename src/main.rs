use std::path::Path;
use std::process;

use log::{error, warn};

use softras::app::App;
use softras::config::{self, ConfigError};
use softras::scene::Scene;
use softras::window::{Window, WINDOW_HEIGHT, WINDOW_WIDTH};

fn main() {
    env_logger::init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "scene.cfg".into());

    let window = match Window::new("softras", WINDOW_WIDTH, WINDOW_HEIGHT) {
        Ok(window) => window,
        Err(e) => {
            error!("window creation failed: {}", e);
            process::exit(-1);
        }
    };

    let (scene, positions) = match config::load_scene(
        Path::new(&config_path),
        Path::new("Models"),
        WINDOW_WIDTH,
        WINDOW_HEIGHT,
    ) {
        Ok(loaded) => loaded,
        Err(ConfigError::Io(e)) => {
            warn!("config '{}' not readable ({}), starting empty", config_path, e);
            (Scene::new(WINDOW_WIDTH, WINDOW_HEIGHT), Vec::new())
        }
        Err(e) => {
            error!("failed to load scene: {}", e);
            process::exit(-1);
        }
    };

    let mut app = App::new(window, scene, positions);
    process::exit(app.run());
}

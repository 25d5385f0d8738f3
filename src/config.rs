//! Scene config parsing.
//!
//! A config file is UTF-8, line-based, with the first token driving the
//! line:
//!
//! ```text
//! fov_deg 90
//! z_bound 1 10
//! wireframe 1
//! cam_light 1
//! light 0 0 -1
//! model cube 0xFF0000 0 0 5 1.0
//! ```
//!
//! `model` resolves `<models_dir>/<name>.obj`; a missing mesh falls back to
//! `<models_dir>/cube.obj` with a warning. Comments start with `#`.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::str::{FromStr, SplitWhitespace};
use std::sync::Arc;

use log::warn;

use crate::color::Color;
use crate::math::vec3::Vec3;
use crate::model::{MeshError, Model};
use crate::scene::Scene;

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Mesh(MeshError),
    /// A directive field was missing or failed to parse.
    Malformed { line: usize, field: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Mesh(e) => write!(f, "failed to load model: {}", e),
            ConfigError::Malformed { line, field } => {
                write!(f, "bad or missing '{}' value on line {}", field, line)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Mesh(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Reads a config file into a scene sized for the given buffer, plus the
/// base position of every model (the animation loop works from those).
pub fn load_scene(
    path: &Path,
    models_dir: &Path,
    width: u32,
    height: u32,
) -> Result<(Scene, Vec<Vec3>), ConfigError> {
    let text = fs::read_to_string(path)?;
    parse_scene(&text, models_dir, width, height)
}

pub(crate) fn parse_scene(
    text: &str,
    models_dir: &Path,
    width: u32,
    height: u32,
) -> Result<(Scene, Vec<Vec3>), ConfigError> {
    let mut scene = Scene::new(width, height);
    let mut positions = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let mut tokens = line.split_whitespace();
        let Some(directive) = tokens.next() else {
            continue;
        };
        match directive {
            _ if directive.starts_with('#') => {}
            "fov_deg" => {
                let deg: f32 = field(&mut tokens, line_no, "fov_deg")?;
                scene.set_fov(deg.to_radians());
            }
            "z_bound" => {
                let znear: f32 = field(&mut tokens, line_no, "znear")?;
                let zfar: f32 = field(&mut tokens, line_no, "zfar")?;
                scene.set_z_bound(znear, zfar);
            }
            "wireframe" => {
                let flag: i32 = field(&mut tokens, line_no, "wireframe")?;
                scene.set_wireframe(flag != 0);
            }
            "cam_light" => {
                let flag: i32 = field(&mut tokens, line_no, "cam_light")?;
                scene.set_cam_light(flag != 0);
            }
            "light" => {
                let x: f32 = field(&mut tokens, line_no, "light x")?;
                let y: f32 = field(&mut tokens, line_no, "light y")?;
                let z: f32 = field(&mut tokens, line_no, "light z")?;
                scene.add_light(Vec3::new(x, y, z));
            }
            "model" => {
                let name = tokens.next().ok_or(ConfigError::Malformed {
                    line: line_no,
                    field: "model name",
                })?;
                let color = parse_hex_color(&mut tokens, line_no)?;
                let x: f32 = field(&mut tokens, line_no, "model x")?;
                let y: f32 = field(&mut tokens, line_no, "model y")?;
                let z: f32 = field(&mut tokens, line_no, "model z")?;
                let scale: f32 = field(&mut tokens, line_no, "model scale")?;

                let mut model = load_model(models_dir, name)?;
                model.set_color(color);
                let pos = Vec3::new(x, y, z);
                scene.reg_model(Arc::new(model), pos, scale);
                positions.push(pos);
            }
            other => warn!("line {}: unknown directive '{}', skipping", line_no, other),
        }
    }

    Ok((scene, positions))
}

/// Loads `<models_dir>/<name>.obj`, substituting the default cube when the
/// file is missing.
fn load_model(models_dir: &Path, name: &str) -> Result<Model, ConfigError> {
    let path = models_dir.join(format!("{}.obj", name));
    match Model::from_obj(&path) {
        Ok(model) => Ok(model),
        Err(MeshError::Io(_)) => {
            warn!(
                "model file {} not found, falling back to cube",
                path.display()
            );
            Model::from_obj(&models_dir.join("cube.obj")).map_err(ConfigError::Mesh)
        }
        Err(e) => Err(ConfigError::Mesh(e)),
    }
}

fn field<T: FromStr>(
    tokens: &mut SplitWhitespace,
    line: usize,
    name: &'static str,
) -> Result<T, ConfigError> {
    tokens
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or(ConfigError::Malformed { line, field: name })
}

/// Parses an RGB color given as hexadecimal with an optional 0x prefix.
fn parse_hex_color(tokens: &mut SplitWhitespace, line: usize) -> Result<Color, ConfigError> {
    let malformed = ConfigError::Malformed {
        line,
        field: "model color",
    };
    let token = tokens.next().ok_or(ConfigError::Malformed {
        line,
        field: "model color",
    })?;
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    let rgb = u32::from_str_radix(digits, 16).map_err(|_| malformed)?;
    Ok(Color::from_argb(0xFF00_0000 | rgb))
}

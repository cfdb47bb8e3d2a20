//! Offline rect packer: turns a collision file or PNG mask into a merged
//! rectangle set for the runtime.
//!
//! Output is a JSON rect set plus a preview PNG with one color per rect. Both
//! are written to temporary files first and promoted together, so a failed run
//! never leaves a JSON that disagrees with its preview.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use stx_collision::load_collision_from_path;
use stx_rects::{OccupancyGrid, Rect};
use uuid::Uuid;

const RECT_SET_VERSION: &str = "0.1";

#[derive(Debug, Serialize, Deserialize)]
struct RectSetFile {
    version: String,
    rect_set_id: String,
    source_path: String,
    source_hash: String,
    grid: RectSetGrid,
    min_side_length: usize,
    filled_area: u64,
    covered_area: u64,
    rects: Vec<RectEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RectSetGrid {
    width: usize,
    height: usize,
    cell_size: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct RectEntry {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

impl From<Rect> for RectEntry {
    fn from(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PackerConfig {
    input: PathBuf,
    rects_output: PathBuf,
    min_side_length: usize,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("assets/collision/level_collision.json"),
            rects_output: PathBuf::from("assets/generated/level_rects.json"),
            min_side_length: 1,
        }
    }
}

impl PackerConfig {
    fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 3 || args.len() > 4 {
            return Err(usage());
        }
        let min_side_length = match args.get(3) {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| format!("Invalid min_side_length '{raw}': {e}"))?,
            None => Self::default().min_side_length,
        };
        if min_side_length == 0 {
            return Err("min_side_length must be > 0".to_string());
        }
        Ok(Self {
            input: PathBuf::from(&args[1]),
            rects_output: PathBuf::from(&args[2]),
            min_side_length,
        })
    }

    fn preview_output(&self) -> PathBuf {
        self.rects_output.with_extension("preview.png")
    }
}

/// Occupancy loaded from either input kind.
struct SourceGrid {
    grid: OccupancyGrid,
    cell_size: u32,
}

fn usage() -> String {
    "Usage: cargo run -p stx_rect_packer -- <input.json|input.png> <rects_json_output> [min_side_length]\nExample: cargo run -p stx_rect_packer -- assets/collision/m3_collision.json assets/generated/m3_rects.json 2".to_string()
}

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = PackerConfig::from_args(&args)?;
    run(&config)
}

fn run(config: &PackerConfig) -> Result<(), String> {
    let source = load_source_grid(&config.input)?;
    let source_hash = hash_source(&source.grid, source.cell_size);

    if existing_output_is_current(config, &source_hash)? {
        log::info!(
            "Rect set '{}' is up to date, skipping",
            config.rects_output.display()
        );
        return Ok(());
    }

    let tiling = source.grid.tile::<u16>(config.min_side_length);
    let rects = tiling.rects();
    let filled_area = source.grid.filled_count() as u64;
    if tiling.covered_area() < filled_area {
        log::warn!(
            "{} of {} filled cells left untiled at min side length {}",
            filled_area - tiling.covered_area(),
            filled_area,
            config.min_side_length
        );
    }

    let preview = render_preview(&source.grid, &rects);
    let rect_set = RectSetFile {
        version: RECT_SET_VERSION.to_string(),
        rect_set_id: rect_set_id_for(&source_hash),
        source_path: normalize_path_for_json(&config.input),
        source_hash,
        grid: RectSetGrid {
            width: source.grid.width(),
            height: source.grid.height(),
            cell_size: source.cell_size,
        },
        min_side_length: config.min_side_length,
        filled_area,
        covered_area: tiling.covered_area(),
        rects: rects.iter().copied().map(RectEntry::from).collect(),
    };

    let preview_output = config.preview_output();
    if let Some(parent) = config.rects_output.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            format!(
                "Failed to create rect set output dir '{}': {e}",
                parent.display()
            )
        })?;
    }

    let preview_tmp = temporary_output_path(&preview_output);
    preview
        .save_with_format(&preview_tmp, image::ImageFormat::Png)
        .map_err(|e| format!("Failed to write '{}': {e}", preview_tmp.display()))?;

    let json = serde_json::to_string_pretty(&rect_set)
        .map_err(|e| format!("Failed to serialize rect set: {e}"))?;
    let json_tmp = temporary_output_path(&config.rects_output);
    fs::write(&json_tmp, json)
        .map_err(|e| format!("Failed to write '{}': {e}", json_tmp.display()))?;

    promote_outputs_transactional(&[
        (&json_tmp, &config.rects_output),
        (&preview_tmp, &preview_output),
    ])?;

    log::info!(
        "Packed {} rects covering {}/{} cells -> {} and {}",
        rect_set.rects.len(),
        rect_set.covered_area,
        rect_set.filled_area,
        config.rects_output.display(),
        preview_output.display()
    );
    Ok(())
}

fn load_source_grid(path: &Path) -> Result<SourceGrid, String> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let collision = load_collision_from_path(path)?;
            Ok(SourceGrid {
                grid: collision.occupancy(),
                cell_size: collision.cell_size as u32,
            })
        }
        Some("png") => {
            let mask = image::open(path)
                .map_err(|e| format!("Failed to open '{}': {e}", path.display()))?
                .to_rgba8();
            Ok(SourceGrid {
                grid: grid_from_mask(&mask),
                cell_size: 1,
            })
        }
        _ => Err(format!(
            "Unsupported input '{}': expected a .json collision file or a .png mask",
            path.display()
        )),
    }
}

/// Any pixel with non-zero alpha is a filled cell.
fn grid_from_mask(mask: &RgbaImage) -> OccupancyGrid {
    let (width, height) = mask.dimensions();
    let mut grid = OccupancyGrid::new(width as usize, height as usize);
    for (x, y, pixel) in mask.enumerate_pixels() {
        if pixel.0[3] != 0 {
            grid.set(x as usize, y as usize, true);
        }
    }
    grid
}

fn render_preview(grid: &OccupancyGrid, rects: &[Rect]) -> RgbaImage {
    let mut preview = RgbaImage::new(grid.width() as u32, grid.height() as u32);
    // Untiled cells stay visible in gray.
    for (x, y, pixel) in preview.enumerate_pixels_mut() {
        if grid.is_filled(x as usize, y as usize) {
            *pixel = Rgba([96, 96, 96, 255]);
        }
    }
    for (index, rect) in rects.iter().enumerate() {
        let color = preview_color(index);
        for (x, y) in rect.cells() {
            preview.put_pixel(x as u32, y as u32, color);
        }
    }
    preview
}

fn preview_color(index: usize) -> Rgba<u8> {
    const PALETTE: [[u8; 3]; 8] = [
        [230, 25, 75],
        [60, 180, 75],
        [255, 225, 25],
        [0, 130, 200],
        [245, 130, 48],
        [145, 30, 180],
        [70, 240, 240],
        [240, 50, 230],
    ];
    let [r, g, b] = PALETTE[index % PALETTE.len()];
    Rgba([r, g, b, 255])
}

fn normalize_path_for_json(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Hashes everything the rect set depends on: grid shape, occupancy and the
/// cell size written into the output.
fn hash_source(grid: &OccupancyGrid, cell_size: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update((grid.width() as u64).to_le_bytes());
    hasher.update((grid.height() as u64).to_le_bytes());
    hasher.update(cell_size.to_le_bytes());
    // Only occupancy matters, not which non-zero value marks a cell.
    let normalized: Vec<u8> = grid.cells().iter().map(|&c| u8::from(c != 0)).collect();
    hasher.update(&normalized);
    let digest = hasher.finalize();
    format!("{digest:x}")
}

fn rect_set_id_for(source_hash: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, source_hash.as_bytes()).to_string()
}

fn existing_output_is_current(config: &PackerConfig, source_hash: &str) -> Result<bool, String> {
    let rects_output = &config.rects_output;
    if !rects_output.exists() {
        return Ok(false);
    }
    if !config.preview_output().exists() {
        log::info!(
            "Preview '{}' is missing, regenerating",
            config.preview_output().display()
        );
        return Ok(false);
    }

    let raw = fs::read_to_string(rects_output).map_err(|e| {
        format!(
            "Failed to read existing rect set '{}': {e}",
            rects_output.display()
        )
    })?;
    let existing = match serde_json::from_str::<RectSetFile>(&raw) {
        Ok(existing) => existing,
        Err(err) => {
            log::warn!(
                "Existing rect set '{}' is unreadable ({err}), regenerating",
                rects_output.display()
            );
            return Ok(false);
        }
    };
    Ok(existing.version == RECT_SET_VERSION
        && existing.source_hash == source_hash
        && existing.min_side_length == config.min_side_length)
}

fn temporary_output_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("output");
    path.with_file_name(format!("{file_name}.tmp"))
}

fn promote_temporary_file(temp_path: &Path, final_path: &Path) -> Result<(), String> {
    if final_path.exists() {
        fs::remove_file(final_path).map_err(|e| {
            format!(
                "Failed to replace existing output '{}': {e}",
                final_path.display()
            )
        })?;
    }
    fs::rename(temp_path, final_path).map_err(|e| {
        format!(
            "Failed to move temporary output '{}' -> '{}': {e}",
            temp_path.display(),
            final_path.display()
        )
    })
}

fn promote_outputs_transactional(pairs: &[(&Path, &Path)]) -> Result<(), String> {
    let mut backups: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut promoted: Vec<PathBuf> = Vec::new();

    for (_, final_path) in pairs {
        if final_path.exists() {
            let backup_path = final_path.with_extension("bak.tmp");
            fs::rename(final_path, &backup_path).map_err(|e| {
                format!(
                    "Failed to stage backup '{}' -> '{}': {e}",
                    final_path.display(),
                    backup_path.display()
                )
            })?;
            backups.insert((*final_path).to_path_buf(), backup_path);
        }
    }

    for (temp_path, final_path) in pairs {
        match promote_temporary_file(temp_path, final_path) {
            Ok(()) => promoted.push((*final_path).to_path_buf()),
            Err(err) => {
                for promoted_path in promoted.iter().rev() {
                    let _ = fs::remove_file(promoted_path);
                    if let Some(backup_path) = backups.get(promoted_path) {
                        let _ = fs::rename(backup_path, promoted_path);
                    }
                }
                for (final_path, backup_path) in backups {
                    if !final_path.exists() {
                        let _ = fs::rename(backup_path, final_path);
                    }
                }
                return Err(err);
            }
        }
    }

    for (_, backup_path) in backups {
        let _ = fs::remove_file(backup_path);
    }

    Ok(())
}

//! Frame loading.
//! Reads the latest board frame written to disk by the camera collaborator and crops it to
//! the configured board bounds. Device access itself lives outside this crate.
//! Debug: set `DEBUG_CAPTURE=1` to save the cropped frame to `screenshots/debug_board.png`.

use anyhow::{Context, Result, bail};
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Smallest board rectangle we accept, in pixels per side.
const MIN_BOARD_PX: u32 = 64;

/// Board rectangle inside the frame: (x, y) of the top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoardBounds {
    pub fn validate(&self) -> Result<()> {
        if self.width < MIN_BOARD_PX || self.height < MIN_BOARD_PX {
            bail!(
                "Board bounds {}x{} too small for a chessboard (min ~{}x{} pixels)",
                self.width,
                self.height,
                MIN_BOARD_PX,
                MIN_BOARD_PX
            );
        }
        Ok(())
    }
}

/// Loads the frame at `path`, cropped to `bounds` when given.
pub fn load_frame(path: &Path, bounds: Option<BoardBounds>) -> Result<DynamicImage> {
    let start = Instant::now();

    let frame = image::open(path)
        .with_context(|| format!("Failed to open frame: {}", path.display()))?;
    if frame.dimensions() == (0, 0) {
        bail!("Frame {} is empty - capture collaborator may not be running", path.display());
    }

    let board = match bounds {
        Some(b) => crop_to_bounds(&frame, b)?,
        None => frame,
    };

    if env::var_os("DEBUG_CAPTURE").is_some() {
        fs::create_dir_all("screenshots")
            .context("Failed to create screenshots/ debug directory")?;
        board
            .save("screenshots/debug_board.png")
            .context("Failed to save debug board image to screenshots/")?;
    }

    log::debug!("Frame load + crop latency: {:?}", start.elapsed());
    Ok(board)
}

fn crop_to_bounds(frame: &DynamicImage, b: BoardBounds) -> Result<DynamicImage> {
    b.validate()?;
    let (frame_w, frame_h) = frame.dimensions();

    if b.x >= frame_w
        || b.y >= frame_h
        || b.x.saturating_add(b.width) > frame_w
        || b.y.saturating_add(b.height) > frame_h
    {
        bail!(
            "Crop bounds ({},{},{},{}) exceed frame dimensions {}x{}",
            b.x, b.y, b.width, b.height, frame_w, frame_h
        );
    }

    Ok(frame.crop_imm(b.x, b.y, b.width, b.height))
}

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::Serialize;
use thiserror::Error;

use crate::constants::PHOTO_BONUS_POINTS;
use crate::types::RoomId;

pub const PHOTO_MIN_BYTES: usize = 50 * 1024;
pub const PHOTO_MAX_BYTES: usize = 10 * 1024 * 1024;
pub const PHOTO_MIN_SIDE: u32 = 300;
const SAMPLE_WIDTH: u32 = 160;
const SAMPLE_STRIDE: usize = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhotoRejection {
    #[error("Please upload a valid image file (JPG, PNG, etc.)")]
    NotAnImage,
    #[error("Image too small. Please upload a clear photo (>50KB).")]
    TooSmall { bytes: usize },
    #[error("Image too large. Please upload a smaller file (<10MB).")]
    TooLarge { bytes: usize },
    #[error("Image resolution too low. Use a clearer photo (min 300x300px).")]
    LowResolution { width: u32, height: u32 },
    #[error("Could not analyze image. Please try again.")]
    Undecodable(String),
    #[error("{}", unrecognised_reason(.0))]
    NotRecognised(RoomId),
}

fn unrecognised_reason(room: &RoomId) -> &'static str {
    match room {
        RoomId::Energy => "Image does not appear to show renewable energy sources. Please upload a photo of solar panels, wind turbines, or clean energy infrastructure.",
        RoomId::Waste => "Could not detect multiple waste bins. Ensure the photo clearly shows separate bins.",
        RoomId::Water => "Image does not appear to show a water filter. Please upload a photo of your DIY water filtration system with materials like sand, gravel, charcoal, or cotton.",
        RoomId::Shelter => "Image does not appear to show a shelter design. Please upload a photo of your eco-friendly shelter design with sustainable materials like bamboo, solar panels, or green building elements.",
        RoomId::Policy => "Image does not appear to show a policy proposal. Please upload a photo of your sustainability proposal document, sketch, or presentation with clear text or diagrams.",
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ColourCounts {
    pub sampled: u32,
    pub blue: u32,
    pub white: u32,
    pub green: u32,
    pub brown: u32,
    pub black: u32,
    pub gray: u32,
    pub red: u32,
    pub yellow: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PhotoVerdict {
    pub room: RoomId,
    pub counts: ColourCounts,
    pub indicators: u32,
    pub bonus: u32,
}

#[derive(Clone, Copy)]
struct Chroma {
    r: f32,
    g: f32,
    b: f32,
}

impl Chroma {
    fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let sum = r as f32 + g as f32 + b as f32 + 1.0;
        Self {
            r: r as f32 / sum,
            g: g as f32 / sum,
            b: b as f32 / sum,
        }
    }

    fn is_blue(self, floor: f32) -> bool {
        self.b > floor && self.b > self.r + 0.1 && self.b > self.g + 0.1
    }

    fn is_green(self, floor: f32) -> bool {
        self.g > floor && self.g > self.r + 0.1 && self.g > self.b + 0.1
    }

    fn is_red(self) -> bool {
        self.r > 0.45 && self.r > self.g + 0.1 && self.r > self.b + 0.1
    }

    fn is_yellow(self) -> bool {
        self.r > 0.35 && self.g > 0.35 && self.b < 0.2
    }

    fn is_white(self) -> bool {
        self.r > 0.8 && self.g > 0.8 && self.b > 0.8
    }

    fn is_black(self) -> bool {
        self.r < 0.3 && self.g < 0.3 && self.b < 0.3
    }

    fn is_brown(self) -> bool {
        self.r > 0.3 && self.g > 0.2 && self.b < 0.2
    }

    fn is_gray(self) -> bool {
        (self.r - self.g).abs() < 0.1 && (self.g - self.b).abs() < 0.1 && self.r < 0.7
    }
}

fn tally(room: RoomId, chroma: Chroma, counts: &mut ColourCounts) {
    let bucket = match room {
        RoomId::Energy => {
            if chroma.is_blue(0.4) {
                Some(&mut counts.blue)
            } else if chroma.is_white() {
                Some(&mut counts.white)
            } else if chroma.is_green(0.4) {
                Some(&mut counts.green)
            } else {
                None
            }
        }
        RoomId::Waste => {
            if chroma.is_green(0.45) {
                Some(&mut counts.green)
            } else if chroma.is_blue(0.45) {
                Some(&mut counts.blue)
            } else if chroma.is_red() {
                Some(&mut counts.red)
            } else if chroma.is_yellow() {
                Some(&mut counts.yellow)
            } else {
                None
            }
        }
        RoomId::Water => {
            if chroma.is_blue(0.4) {
                Some(&mut counts.blue)
            } else if chroma.is_brown() {
                Some(&mut counts.brown)
            } else if chroma.is_black() {
                Some(&mut counts.black)
            } else if chroma.is_white() {
                Some(&mut counts.white)
            } else {
                None
            }
        }
        RoomId::Shelter => {
            if chroma.is_brown() {
                Some(&mut counts.brown)
            } else if chroma.is_gray() {
                Some(&mut counts.gray)
            } else if chroma.is_green(0.4) {
                Some(&mut counts.green)
            } else if chroma.is_blue(0.4) {
                Some(&mut counts.blue)
            } else {
                None
            }
        }
        RoomId::Policy => {
            if chroma.is_white() {
                Some(&mut counts.white)
            } else if chroma.is_black() {
                Some(&mut counts.black)
            } else if chroma.is_green(0.4) {
                Some(&mut counts.green)
            } else if chroma.is_blue(0.4) {
                Some(&mut counts.blue)
            } else {
                None
            }
        }
    };
    if let Some(bucket) = bucket {
        *bucket += 1;
    }
}

pub fn sample_colours(room: RoomId, image: &RgbaImage) -> ColourCounts {
    let (width, height) = image.dimensions();
    let sample_height = if width == 0 {
        1
    } else {
        ((height as f64 / width as f64) * SAMPLE_WIDTH as f64)
            .floor()
            .max(1.0) as u32
    };
    let resized = imageops::resize(image, SAMPLE_WIDTH, sample_height, FilterType::Triangle);

    let mut counts = ColourCounts::default();
    for pixel in resized.pixels().step_by(SAMPLE_STRIDE) {
        let [r, g, b, _] = pixel.0;
        counts.sampled += 1;
        tally(room, Chroma::from_rgb(r, g, b), &mut counts);
    }
    counts
}

pub fn judge_colours(room: RoomId, counts: &ColourCounts) -> Result<u32, PhotoRejection> {
    let (indicators, accepted) = match room {
        RoomId::Energy => {
            let total = counts.blue + counts.white + counts.green;
            (total, total >= 20)
        }
        RoomId::Water => {
            let total = counts.blue + counts.brown + counts.black + counts.white;
            (total, total >= 30)
        }
        RoomId::Shelter => {
            let total = counts.brown + counts.gray + counts.green + counts.blue;
            (total, total >= 25)
        }
        RoomId::Policy => {
            let total = counts.white + counts.black + counts.green + counts.blue;
            (total, total >= 40)
        }
        RoomId::Waste => {
            let bins = [
                counts.green > 40,
                counts.blue > 40,
                counts.red > 30,
                counts.yellow > 30,
            ]
            .into_iter()
            .filter(|detected| *detected)
            .count() as u32;
            (bins, bins >= 2)
        }
    };
    if accepted {
        Ok(indicators)
    } else {
        Err(PhotoRejection::NotRecognised(room))
    }
}

pub fn verify_photo(
    room: RoomId,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<PhotoVerdict, PhotoRejection> {
    match content_type {
        Some(declared) if !declared.trim().to_ascii_lowercase().starts_with("image/") => {
            return Err(PhotoRejection::NotAnImage);
        }
        Some(_) => {}
        None => {
            if image::guess_format(bytes).is_err() {
                return Err(PhotoRejection::NotAnImage);
            }
        }
    }
    if bytes.len() < PHOTO_MIN_BYTES {
        return Err(PhotoRejection::TooSmall { bytes: bytes.len() });
    }
    if bytes.len() > PHOTO_MAX_BYTES {
        return Err(PhotoRejection::TooLarge { bytes: bytes.len() });
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|error| PhotoRejection::Undecodable(error.to_string()))?;
    judge_image(room, &decoded.to_rgba8())
}

pub fn judge_image(room: RoomId, rgba: &RgbaImage) -> Result<PhotoVerdict, PhotoRejection> {
    let (width, height) = rgba.dimensions();
    if width < PHOTO_MIN_SIDE || height < PHOTO_MIN_SIDE {
        return Err(PhotoRejection::LowResolution { width, height });
    }

    let counts = sample_colours(room, rgba);
    let indicators = judge_colours(room, &counts).inspect_err(|_| {
        log::debug!(
            "[photo] {} photo rejected after {} samples",
            room.as_str(),
            counts.sampled
        );
    })?;
    log::info!(
        "[photo] {} photo verified with {indicators} indicators",
        room.as_str()
    );
    Ok(PhotoVerdict {
        room,
        counts,
        indicators,
        bonus: PHOTO_BONUS_POINTS,
    })
}

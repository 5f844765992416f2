use crate::{
    config::RemovalConfig,
    error::{RemovalError, Result},
    removal::BackgroundRemover,
    video::types::{Frame, PixelOrder},
};

/// Chroma-key background removal
///
/// Pixels close to the key color are replaced by the background, pixels far
/// from it are kept, and a soft band in between is blended. When no key color
/// is configured the key is taken from the frame border, which must then be a
/// reasonably uniform screen.
#[derive(Debug, Clone)]
pub struct ChromaKeyRemover {
    key_color: Option<[u8; 3]>,
    tolerance: f32,
    softness: f32,
    max_border_spread: f32,
}

impl Default for ChromaKeyRemover {
    fn default() -> Self {
        Self::from_config(&RemovalConfig::default())
    }
}

impl ChromaKeyRemover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RemovalConfig) -> Self {
        Self {
            key_color: config.key_color,
            tolerance: config.tolerance,
            softness: config.softness,
            max_border_spread: config.max_border_spread,
        }
    }

    /// Use a fixed key color instead of detecting it
    pub fn with_key(mut self, key_color: [u8; 3]) -> Self {
        self.key_color = Some(key_color);
        self
    }

    /// Mean color of the outermost ring of pixels
    fn detect_key(&self, frame: &Frame) -> Result<[f32; 3]> {
        let border = border_pixels(frame);
        if border.is_empty() {
            return Err(RemovalError::Segmentation {
                reason: "frame has no pixels".to_string(),
            }
            .into());
        }

        let count = border.len() as f32;
        let mut mean = [0.0f32; 3];
        for pixel in &border {
            for c in 0..3 {
                mean[c] += pixel[c] as f32 / count;
            }
        }

        let spread = border.iter().map(|pixel| distance(pixel, &mean)).sum::<f32>() / count;
        if spread > self.max_border_spread {
            return Err(RemovalError::Segmentation {
                reason: format!(
                    "frame {} border is not a uniform screen (spread {:.1} > {:.1})",
                    frame.index(),
                    spread,
                    self.max_border_spread
                ),
            }
            .into());
        }

        Ok(mean)
    }

    /// Foreground weight for a pixel at `distance` from the key
    fn foreground_weight(&self, distance: f32) -> f32 {
        if distance <= self.tolerance {
            0.0
        } else if self.softness <= 0.0 || distance >= self.tolerance + self.softness {
            1.0
        } else {
            (distance - self.tolerance) / self.softness
        }
    }
}

impl BackgroundRemover for ChromaKeyRemover {
    fn name(&self) -> &str {
        "chroma"
    }

    fn expected_order(&self) -> PixelOrder {
        PixelOrder::Rgb
    }

    fn replace_background(&self, frame: &Frame, background: &Frame) -> Result<Frame> {
        if frame.width() != background.width() || frame.height() != background.height() {
            return Err(RemovalError::Segmentation {
                reason: format!(
                    "background is {}x{} but frame {} is {}x{}",
                    background.width(),
                    background.height(),
                    frame.index(),
                    frame.width(),
                    frame.height()
                ),
            }
            .into());
        }

        let key = match self.key_color {
            Some(color) => [color[0] as f32, color[1] as f32, color[2] as f32],
            None => self.detect_key(frame)?,
        };

        let mut output = frame.clone();
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                let pixel = frame.get_pixel(x, y);
                let weight = self.foreground_weight(distance(&pixel, &key));

                if weight >= 1.0 {
                    continue;
                }

                let behind = background.get_pixel(x, y);
                let mut blended = [0u8; 3];
                for c in 0..3 {
                    let value = pixel[c] as f32 * weight + behind[c] as f32 * (1.0 - weight);
                    blended[c] = value.round().clamp(0.0, 255.0) as u8;
                }
                output.set_pixel(x, y, blended);
            }
        }

        Ok(output)
    }
}

fn distance(pixel: &[u8; 3], key: &[f32; 3]) -> f32 {
    let dr = pixel[0] as f32 - key[0];
    let dg = pixel[1] as f32 - key[1];
    let db = pixel[2] as f32 - key[2];
    (dr * dr + dg * dg + db * db).sqrt()
}

fn border_pixels(frame: &Frame) -> Vec<[u8; 3]> {
    let (width, height) = (frame.width(), frame.height());
    let mut pixels = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if y == 0 || y + 1 == height || x == 0 || x + 1 == width {
                pixels.push(frame.get_pixel(x, y));
            }
        }
    }

    pixels
}

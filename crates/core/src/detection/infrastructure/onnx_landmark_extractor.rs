//! 68-point facial landmark regressor using ONNX Runtime.
//!
//! The face box is squared up with a margin, cropped, resized to the model
//! input and scaled to `[0, 1]`. The model returns 136 values (x, y pairs)
//! normalized to the crop, which are mapped back to frame pixels.
use std::path::Path;

use crate::detection::domain::face_shape::{FaceShape, LANDMARK_COUNT};
use crate::detection::domain::landmark_extractor::LandmarkExtractor;
use crate::shared::frame::Frame;
use crate::shared::point::Point;
use crate::shared::region::Region;

use super::onnx_session::{open_session, square_input_size};

const DEFAULT_INPUT_SIZE: usize = 112;

/// Fraction of the longer face side added on each edge before cropping.
pub const DEFAULT_CROP_MARGIN: f64 = 0.1;

pub struct OnnxLandmarkExtractor {
    session: ort::session::Session,
    input_size: usize,
    margin: f64,
}

impl OnnxLandmarkExtractor {
    pub fn new(model_path: &Path, margin: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path)?;
        let input_size = square_input_size(&session).unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("Landmark model input size: {input_size}");

        Ok(Self {
            session,
            input_size,
            margin,
        })
    }
}

impl LandmarkExtractor for OnnxLandmarkExtractor {
    fn extract(
        &mut self,
        frame: &Frame,
        face: &Region,
    ) -> Result<FaceShape, Box<dyn std::error::Error>> {
        let crop_region = face
            .expand_to_square(self.margin)
            .clamp_to(frame.width(), frame.height())
            .ok_or("face box lies outside the frame")?;
        let crop = frame
            .crop(&crop_region)
            .ok_or("face box lies outside the frame")?;

        let input_value = ort::value::Tensor::from_array(preprocess(&crop, self.input_size))?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("landmark model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let values = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let points = decode_landmarks(values, &crop_region)?;
        Ok(FaceShape::new(points)?)
    }
}

/// Nearest-neighbour resize to `size` x `size`, `[0, 1]` scaling, NCHW layout.
fn preprocess(crop: &Frame, size: usize) -> ndarray::Array4<f32> {
    let src_w = crop.width() as f64;
    let src_h = crop.height() as f64;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));

    for y in 0..size {
        let src_y = ((y as f64 + 0.5) * src_h / size as f64) as i64;
        for x in 0..size {
            let src_x = ((x as f64 + 0.5) * src_w / size as f64) as i64;
            if let Some(rgb) = crop.pixel(src_x, src_y) {
                for (c, value) in rgb.iter().enumerate() {
                    tensor[[0, c, y, x]] = *value as f32 / 255.0;
                }
            }
        }
    }

    tensor
}

/// Map crop-normalized `(x, y)` pairs back into frame coordinates.
fn decode_landmarks(values: &[f32], crop: &Region) -> Result<Vec<Point>, String> {
    let needed = LANDMARK_COUNT * 2;
    if values.len() < needed {
        return Err(format!(
            "landmark model returned {} values, expected {needed}",
            values.len()
        ));
    }

    Ok(values[..needed]
        .chunks_exact(2)
        .map(|xy| {
            Point::new(
                crop.x as f64 + xy[0] as f64 * crop.width as f64,
                crop.y as f64 + xy[1] as f64 * crop.height as f64,
            )
        })
        .collect())
}

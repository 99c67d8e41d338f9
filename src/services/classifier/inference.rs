use crate::error::OracleError;
use image::ImageReader;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;

pub const CROP_SIZE: u32 = 224;
const CROP_PCT: f32 = 0.875;

// CLIP normalization constants
const MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_1];

pub struct Preprocessed {
    pub tensor: Array4<f32>,
    pub width: u32,
    pub height: u32,
}

pub fn preprocess_image(path: &Path, crop_size: u32) -> Result<Preprocessed, OracleError> {
    let img = ImageReader::open(path)
        .map_err(|source| OracleError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| OracleError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| OracleError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let (w, h) = (img.width(), img.height());
    if w == 0 || h == 0 {
        return Err(OracleError::Inference(format!("{} has zero size", path.display())));
    }

    // Resize shortest edge to ceil(crop_size / crop_pct), then center crop
    let resize_size = (crop_size as f32 / CROP_PCT).ceil() as u32;
    let (new_w, new_h) = if w < h {
        (resize_size, ((h as f32 / w as f32) * resize_size as f32).round() as u32)
    } else {
        (((w as f32 / h as f32) * resize_size as f32).round() as u32, resize_size)
    };
    let resized = img.resize_exact(new_w, new_h, image::imageops::FilterType::Triangle);

    let crop_x = (new_w.saturating_sub(crop_size)) / 2;
    let crop_y = (new_h.saturating_sub(crop_size)) / 2;
    let rgb = resized.crop_imm(crop_x, crop_y, crop_size, crop_size).to_rgb8();

    // HWC u8 -> normalized CHW f32
    let hw = (crop_size * crop_size) as usize;
    let mut data = vec![0f32; 3 * hw];
    for (i, pixel) in rgb.into_raw().chunks_exact(3).enumerate() {
        for c in 0..3 {
            data[c * hw + i] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    let tensor = Array4::from_shape_vec((1, 3, crop_size as usize, crop_size as usize), data)
        .map_err(|e| OracleError::Inference(format!("Failed to create tensor: {}", e)))?;

    Ok(Preprocessed {
        tensor,
        width: w,
        height: h,
    })
}

/// Run the model and return the raw logits of its first output.
pub fn run_inference(model: &mut Session, input: Array4<f32>) -> Result<Vec<f32>, OracleError> {
    let input_name = model.inputs()[0].name().to_string();
    let input_tensor = Value::from_array(input)
        .map_err(|e| OracleError::Inference(format!("Failed to create tensor value: {}", e)))?;

    let outputs = model
        .run(ort::inputs![input_name.as_str() => input_tensor])
        .map_err(|e| OracleError::Inference(e.to_string()))?;

    let output_value = outputs
        .values()
        .next()
        .ok_or_else(|| OracleError::Inference("Model produced no outputs".to_string()))?;

    let (_, data) = output_value
        .try_extract_tensor::<f32>()
        .map_err(|e| OracleError::Inference(format!("Failed to extract output tensor: {}", e)))?;
    Ok(data.to_vec())
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp_sum: f32 = logits.iter().map(|&x| (x - max_logit).exp()).sum();
    logits
        .iter()
        .map(|&x| (x - max_logit).exp() / exp_sum)
        .collect()
}

/// ONNX Runtime implementation of the vision capability.
///
/// Sessions are loaded once at construction and serialized behind mutexes
/// (an ort session needs `&mut` to run). Model contract:
/// - detector: NCHW float input scaled to [0, 1]; output rows
///   `[x0, y0, x1, y1, score]` in input pixel scale, NMS already applied
///   by the exported graph, shape `[1, N, 5]` or `[N, 5]`;
/// - embedder: 112x112 NCHW crop, exactly 128 floats out;
/// - landmarker (optional): same crop, 10 floats — five x/y pairs in
///   [0, 1] crop coordinates, ordered left eye, right eye, nose, left
///   mouth corner, right mouth corner;
/// - age (optional): 81-class head, reduced by softmax expectation;
/// - gender (optional): 2-class head, argmax (0 = female, 1 = male).
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array4;

use crate::error::FaceError;
use crate::recognition::domain::descriptor::{Descriptor, DESCRIPTOR_LEN};
use crate::recognition::domain::vision_backend::{DetectorVariant, Gender, VisionBackend};
use crate::shared::frame::Frame;
use crate::shared::geometry::{Point, Rect};

/// Crop-head (embedder/landmarker/demographics) input resolution.
const CROP_INPUT_SIZE: usize = 112;

/// Normalization applied to crop inputs.
const CROP_NORM_MEAN: f32 = 127.5;
const CROP_NORM_STD: f32 = 127.5;

/// Detector input resolution when the model doesn't declare one.
const DEFAULT_DETECT_SIZE: u32 = 640;

/// Values per detector output row.
const DET_ROW_LEN: usize = 5;

/// Classes in the age head.
const AGE_CLASSES: usize = 81;

/// Default detection score threshold.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

/// Default extra context around a face box before descriptor extraction,
/// as a fraction of the box size; the recognition nets are trained on
/// padded chips.
pub const DEFAULT_CROP_PADDING: f32 = 0.25;

/// Tuning knobs applied to every call on one backend.
#[derive(Clone, Debug)]
pub struct OnnxBackendConfig {
    pub score_threshold: f32,
    pub crop_padding: f32,
    /// Detections narrower or shorter than this many pixels are dropped.
    pub min_face_size: i32,
}

impl Default for OnnxBackendConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            crop_padding: DEFAULT_CROP_PADDING,
            min_face_size: 0,
        }
    }
}

/// Model files for the sessions one backend loads.
///
/// `detector` and `embedder` are required; the rest enable the CNN
/// detector variant, landmarks and the demographic calls.
#[derive(Clone, Debug, Default)]
pub struct OnnxModelPaths {
    pub detector: PathBuf,
    pub cnn_detector: Option<PathBuf>,
    pub embedder: PathBuf,
    pub landmarker: Option<PathBuf>,
    pub age: Option<PathBuf>,
    pub gender: Option<PathBuf>,
}

struct DetectorSession {
    session: Mutex<ort::session::Session>,
    input_size: u32,
}

pub struct OnnxVisionBackend {
    detector: DetectorSession,
    cnn_detector: Option<DetectorSession>,
    embedder: Mutex<ort::session::Session>,
    landmarker: Option<Mutex<ort::session::Session>>,
    age: Option<Mutex<ort::session::Session>>,
    gender: Option<Mutex<ort::session::Session>>,
    config: OnnxBackendConfig,
}

impl OnnxVisionBackend {
    pub fn new(paths: &OnnxModelPaths) -> Result<Self, FaceError> {
        Self::with_config(paths, OnnxBackendConfig::default())
    }

    pub fn with_config(
        paths: &OnnxModelPaths,
        config: OnnxBackendConfig,
    ) -> Result<Self, FaceError> {
        let detector = load_detector(&paths.detector)?;
        let cnn_detector = paths.cnn_detector.as_deref().map(load_detector).transpose()?;
        let embedder = Mutex::new(load_session(&paths.embedder)?);
        let landmarker = load_optional(paths.landmarker.as_deref())?;
        let age = load_optional(paths.age.as_deref())?;
        let gender = load_optional(paths.gender.as_deref())?;

        Ok(Self {
            detector,
            cnn_detector,
            embedder,
            landmarker,
            age,
            gender,
            config,
        })
    }

    fn detector_for(&self, variant: DetectorVariant) -> Result<&DetectorSession, FaceError> {
        match variant {
            DetectorVariant::Frontal => Ok(&self.detector),
            DetectorVariant::Cnn => self.cnn_detector.as_ref().ok_or_else(|| {
                FaceError::Recognize("CNN detector model not loaded".into())
            }),
        }
    }

    /// Padded crop around `rect`, guarded against degenerate results.
    fn face_crop(&self, frame: &Frame, rect: Rect) -> Result<(Frame, Rect), FaceError> {
        let padded = pad_rect(rect, self.config.crop_padding)
            .clamped_to(frame.width(), frame.height());
        if padded.is_empty() {
            return Err(FaceError::Recognize(
                "face region outside the source frame".into(),
            ));
        }
        Ok((frame.crop(padded), padded))
    }

    fn run_crop_head(
        &self,
        session: &Mutex<ort::session::Session>,
        crop: &Frame,
    ) -> Result<Vec<f32>, FaceError> {
        run_flat(session, preprocess_crop(crop))
    }
}

impl VisionBackend for OnnxVisionBackend {
    fn detect(&self, frame: &Frame, variant: DetectorVariant) -> Result<Vec<Rect>, FaceError> {
        let detector = self.detector_for(variant)?;
        let size = detector.input_size;
        let input = preprocess_detect(frame, size);

        let tensor = ort::value::Tensor::from_array(input)
            .map_err(|e| FaceError::Unknown(e.to_string()))?;
        let mut session = detector
            .session
            .lock()
            .map_err(|_| FaceError::Unknown("detector session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| FaceError::Unknown(e.to_string()))?;
        let array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| FaceError::Unknown(e.to_string()))?;

        let rows = detection_rows(array.shape())?;
        let data = array
            .as_slice()
            .ok_or_else(|| FaceError::Unknown("non-contiguous detector output".into()))?;

        let scale_x = frame.width() as f32 / size as f32;
        let scale_y = frame.height() as f32 / size as f32;
        Ok(decode_boxes(
            data,
            rows,
            scale_x,
            scale_y,
            self.config.score_threshold,
            self.config.min_face_size,
            frame.width(),
            frame.height(),
        ))
    }

    fn compute_descriptor(
        &self,
        frame: &Frame,
        rect: Rect,
    ) -> Result<(Descriptor, Vec<Point>), FaceError> {
        let (crop, crop_rect) = self.face_crop(frame, rect)?;

        let mut embedding = self.run_crop_head(&self.embedder, &crop)?;
        l2_normalize(&mut embedding);
        let len = embedding.len();
        let descriptor = Descriptor::from_slice(&embedding).ok_or_else(|| {
            FaceError::Recognize(format!(
                "embedding model produced {len} values, expected {DESCRIPTOR_LEN}"
            ))
        })?;

        let landmarks = match &self.landmarker {
            Some(session) => decode_landmarks(&self.run_crop_head(session, &crop)?, crop_rect)?,
            None => Vec::new(),
        };

        Ok((descriptor, landmarks))
    }

    fn estimate_age(&self, frame: &Frame, rect: Rect) -> Result<u32, FaceError> {
        let session = self
            .age
            .as_ref()
            .ok_or_else(|| FaceError::Recognize("age model not loaded".into()))?;
        let (crop, _) = self.face_crop(frame, rect)?;
        let logits = self.run_crop_head(session, &crop)?;
        if logits.len() != AGE_CLASSES {
            return Err(FaceError::Recognize(format!(
                "age model produced {} values, expected {AGE_CLASSES}",
                logits.len()
            )));
        }
        Ok(softmax_expectation(&logits).round() as u32)
    }

    fn estimate_gender(&self, frame: &Frame, rect: Rect) -> Result<Gender, FaceError> {
        let session = self
            .gender
            .as_ref()
            .ok_or_else(|| FaceError::Recognize("gender model not loaded".into()))?;
        let (crop, _) = self.face_crop(frame, rect)?;
        let logits = self.run_crop_head(session, &crop)?;
        if logits.len() < 2 {
            return Err(FaceError::Recognize(format!(
                "gender model produced {} values, expected 2",
                logits.len()
            )));
        }
        Ok(if logits[1] > logits[0] {
            Gender::Male
        } else {
            Gender::Female
        })
    }
}

// ---------------------------------------------------------------------------
// Session loading

fn load_session(path: &Path) -> Result<ort::session::Session, FaceError> {
    if !path.is_file() {
        return Err(FaceError::ImageLoad(format!(
            "model file '{}' not found",
            path.display()
        )));
    }
    ort::session::Session::builder()
        .and_then(|b| {
            b.with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
        })
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| FaceError::Serialization(format!("{}: {e}", path.display())))
}

fn load_optional(path: Option<&Path>) -> Result<Option<Mutex<ort::session::Session>>, FaceError> {
    path.map(|p| load_session(p).map(Mutex::new)).transpose()
}

fn load_detector(path: &Path) -> Result<DetectorSession, FaceError> {
    let session = load_session(path)?;
    // Read the input resolution from the model (NCHW: [1, 3, H, W]);
    // fall back when the shape is dynamic.
    let input_size = session
        .inputs()
        .first()
        .and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                if shape.len() >= 4 && shape[2] > 0 {
                    Some(shape[2] as u32)
                } else {
                    None
                }
            } else {
                None
            }
        })
        .unwrap_or(DEFAULT_DETECT_SIZE);
    log::debug!("detector '{}' input size {input_size}", path.display());

    Ok(DetectorSession {
        session: Mutex::new(session),
        input_size,
    })
}

fn run_flat(
    session: &Mutex<ort::session::Session>,
    input: Array4<f32>,
) -> Result<Vec<f32>, FaceError> {
    let tensor =
        ort::value::Tensor::from_array(input).map_err(|e| FaceError::Unknown(e.to_string()))?;
    let mut session = session
        .lock()
        .map_err(|_| FaceError::Unknown("session lock poisoned".into()))?;
    let outputs = session
        .run(ort::inputs![tensor])
        .map_err(|e| FaceError::Unknown(e.to_string()))?;
    let array = outputs[0]
        .try_extract_array::<f32>()
        .map_err(|e| FaceError::Unknown(e.to_string()))?;
    let slice = array
        .as_slice()
        .ok_or_else(|| FaceError::Unknown("non-contiguous model output".into()))?;
    Ok(slice.to_vec())
}

// ---------------------------------------------------------------------------
// Pre/post-processing

/// Resize to `size` x `size` (nearest neighbor), scale to [0, 1], NCHW.
fn preprocess_detect(frame: &Frame, size: u32) -> Array4<f32> {
    let size = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    fill_resized(frame, size, &mut tensor, |v| v / 255.0);
    tensor
}

/// Resize to 112x112 (nearest neighbor), normalize around 127.5, NCHW.
fn preprocess_crop(crop: &Frame) -> Array4<f32> {
    let mut tensor = Array4::<f32>::zeros((1, 3, CROP_INPUT_SIZE, CROP_INPUT_SIZE));
    fill_resized(crop, CROP_INPUT_SIZE, &mut tensor, |v| {
        (v - CROP_NORM_MEAN) / CROP_NORM_STD
    });
    tensor
}

fn fill_resized(frame: &Frame, size: usize, tensor: &mut Array4<f32>, norm: impl Fn(f32) -> f32) {
    let src_w = frame.width() as usize;
    let src_h = frame.height() as usize;
    if src_w == 0 || src_h == 0 {
        return;
    }
    let data = frame.data();

    for y in 0..size {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / size as f64) as usize).min(src_h - 1);
        for x in 0..size {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / size as f64) as usize).min(src_w - 1);
            let offset = (src_y * src_w + src_x) * 3;
            for c in 0..3 {
                tensor[[0, c, y, x]] = norm(data[offset + c] as f32);
            }
        }
    }
}

/// Number of `[x0, y0, x1, y1, score]` rows in a detector output shape.
fn detection_rows(shape: &[usize]) -> Result<usize, FaceError> {
    match shape {
        [1, n, DET_ROW_LEN] | [n, DET_ROW_LEN] => Ok(*n),
        other => Err(FaceError::Unknown(format!(
            "unexpected detector output shape: {other:?}"
        ))),
    }
}

/// Filter by score and size, scale back to frame coordinates, clamp.
#[allow(clippy::too_many_arguments)]
fn decode_boxes(
    data: &[f32],
    rows: usize,
    scale_x: f32,
    scale_y: f32,
    score_threshold: f32,
    min_face_size: i32,
    frame_width: u32,
    frame_height: u32,
) -> Vec<Rect> {
    let mut rects = Vec::new();
    for row in data.chunks_exact(DET_ROW_LEN).take(rows) {
        if row[4] < score_threshold {
            continue;
        }
        let rect = Rect::new(
            (row[0] * scale_x).round() as i32,
            (row[1] * scale_y).round() as i32,
            (row[2] * scale_x).round() as i32,
            (row[3] * scale_y).round() as i32,
        )
        .clamped_to(frame_width, frame_height);
        if rect.is_empty() || rect.width() < min_face_size || rect.height() < min_face_size {
            continue;
        }
        rects.push(rect);
    }
    rects
}

/// Map five normalized crop-space landmark pairs into image coordinates.
fn decode_landmarks(values: &[f32], crop_rect: Rect) -> Result<Vec<Point>, FaceError> {
    if values.len() < 10 {
        return Err(FaceError::Recognize(format!(
            "landmark model produced {} values, expected 10",
            values.len()
        )));
    }
    let w = crop_rect.width() as f32;
    let h = crop_rect.height() as f32;
    Ok(values[..10]
        .chunks_exact(2)
        .map(|pair| {
            Point::new(
                crop_rect.x0 + (pair[0] * w).round() as i32,
                crop_rect.y0 + (pair[1] * h).round() as i32,
            )
        })
        .collect())
}

/// Expand a box by `padding` of its size on every side.
fn pad_rect(rect: Rect, padding: f32) -> Rect {
    let pad_x = (rect.width() as f32 * padding).round() as i32;
    let pad_y = (rect.height() as f32 * padding).round() as i32;
    Rect::new(
        rect.x0 - pad_x,
        rect.y0 - pad_y,
        rect.x1 + pad_x,
        rect.y1 + pad_y,
    )
}

fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}

/// Expected class index under the softmax of `logits`.
fn softmax_expectation(logits: &[f32]) -> f32 {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.iter()
        .enumerate()
        .map(|(i, e)| i as f32 * e / total)
        .sum()
}

pub const DETECTOR_MODEL_NAME: &str = "yolov8n-face-nms.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/faceprint/faceprint/releases/download/v0.1.0/yolov8n-face-nms.onnx";

pub const CNN_DETECTOR_MODEL_NAME: &str = "yolov8l-face-nms.onnx";
pub const CNN_DETECTOR_MODEL_URL: &str =
    "https://github.com/faceprint/faceprint/releases/download/v0.1.0/yolov8l-face-nms.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "mobilefacenet_128.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/faceprint/faceprint/releases/download/v0.1.0/mobilefacenet_128.onnx";

pub const LANDMARK_MODEL_NAME: &str = "landmark5.onnx";
pub const AGE_MODEL_NAME: &str = "age_resnet10.onnx";
pub const GENDER_MODEL_NAME: &str = "gender_net.onnx";

/// Squared-distance match threshold that works well for the bundled
/// embedding model; see `SampleSet::classify_with_tolerance`.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

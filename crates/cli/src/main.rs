use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use faceprint_core::recognition::domain::descriptor::Descriptor;
use faceprint_core::recognition::domain::vision_backend::DetectorVariant;
use faceprint_core::recognition::infrastructure::model_store;
use faceprint_core::recognition::infrastructure::onnx_backend::{
    OnnxModelPaths, OnnxVisionBackend,
};
use faceprint_core::recognition::recognizer::Recognizer;
use faceprint_core::shared::constants::{
    AGE_MODEL_NAME, CNN_DETECTOR_MODEL_NAME, CNN_DETECTOR_MODEL_URL, DEFAULT_TOLERANCE,
    DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL,
    GENDER_MODEL_NAME, LANDMARK_MODEL_NAME,
};
use faceprint_core::shared::geometry::Rect;
use faceprint_core::shared::image_source::ImageSource;
use faceprint_core::tracking::infrastructure::redetect_tracker::RedetectTracker;
use faceprint_core::tracking::tracker::Tracker;

/// Face detection, recognition and tracking.
#[derive(Parser)]
#[command(name = "faceprint")]
struct Cli {
    /// Directory with bundled ONNX models (otherwise cached/downloaded).
    #[arg(long, global = true)]
    models: Option<PathBuf>,

    /// Use the heavier CNN detector variant.
    #[arg(long, global = true)]
    cnn: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the bounding box of every face in an image.
    Detect {
        image: PathBuf,
    },
    /// Detect faces, then print descriptor, landmarks and demographics.
    Recognize {
        image: PathBuf,

        /// Also run the age/gender heads if their models are present.
        #[arg(long)]
        demographics: bool,
    },
    /// Match the first face in an image against labeled sample images.
    Classify {
        image: PathBuf,

        #[command(flatten)]
        samples: SampleArgs,
    },
    /// Track the given region across an ordered list of frame images.
    Track {
        /// Starting region as x0,y0,x1,y1 on the first frame.
        #[arg(long)]
        region: String,

        /// First frame, then the frames to advance through, in order.
        frames: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct SampleArgs {
    /// Directory with one subdirectory of face images per person.
    #[arg(long)]
    samples: PathBuf,

    /// Maximum squared descriptor distance for a match.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f32,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let backend = build_backend(cli.models.as_deref(), cli.cnn)?;
    let variant = if cli.cnn {
        DetectorVariant::Cnn
    } else {
        DetectorVariant::Frontal
    };

    match cli.command {
        Command::Detect { image } => run_detect(&backend, variant, &image),
        Command::Recognize {
            image,
            demographics,
        } => run_recognize(&backend, variant, &image, demographics),
        Command::Classify { image, samples } => run_classify(&backend, variant, &image, &samples),
        Command::Track { region, frames } => run_track(&backend, variant, &region, &frames),
    }
}

fn build_backend(
    models: Option<&Path>,
    cnn: bool,
) -> Result<Arc<OnnxVisionBackend>, Box<dyn std::error::Error>> {
    let mut paths = OnnxModelPaths {
        detector: model_store::resolve(DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, models)?,
        embedder: model_store::resolve(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, models)?,
        ..OnnxModelPaths::default()
    };
    if cnn {
        paths.cnn_detector = Some(model_store::resolve(
            CNN_DETECTOR_MODEL_NAME,
            CNN_DETECTOR_MODEL_URL,
            models,
        )?);
    }
    // Optional heads are only picked up from a bundled models directory.
    if let Some(dir) = models {
        paths.landmarker = existing(dir.join(LANDMARK_MODEL_NAME));
        paths.age = existing(dir.join(AGE_MODEL_NAME));
        paths.gender = existing(dir.join(GENDER_MODEL_NAME));
    }

    Ok(Arc::new(OnnxVisionBackend::new(&paths)?))
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

fn run_detect(
    backend: &Arc<OnnxVisionBackend>,
    variant: DetectorVariant,
    image: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let recognizer = Recognizer::new(backend.clone());
    let faces = recognizer.detect(ImageSource::File(image), variant)?;

    log::info!("{} face(s) in {}", faces.len(), image.display());
    for face in &faces {
        println!("{}", format_rect(&face.rect));
    }
    Ok(())
}

fn run_recognize(
    backend: &Arc<OnnxVisionBackend>,
    variant: DetectorVariant,
    image: &Path,
    demographics: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let recognizer = Recognizer::new(backend.clone());
    let mut faces = recognizer.detect(ImageSource::File(image), variant)?;

    for face in &mut faces {
        recognizer.recognize(face)?;
        println!("face {}", format_rect(&face.rect));
        for point in face.landmarks() {
            println!("  landmark {},{}", point.x, point.y);
        }
        if demographics {
            match recognizer.estimate_age(face) {
                Ok(age) => println!("  age {age}"),
                Err(e) => log::warn!("age estimation unavailable: {e}"),
            }
            match recognizer.estimate_gender(face) {
                Ok(gender) => println!("  gender {gender:?}"),
                Err(e) => log::warn!("gender estimation unavailable: {e}"),
            }
        }
        if let Some(descriptor) = face.descriptor() {
            println!("  descriptor {}", format_descriptor(descriptor));
        }
    }
    Ok(())
}

fn run_classify(
    backend: &Arc<OnnxVisionBackend>,
    variant: DetectorVariant,
    image: &Path,
    args: &SampleArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let recognizer = Recognizer::new(backend.clone());
    let (descriptors, categories, labels) = load_samples(&recognizer, variant, &args.samples)?;
    if descriptors.is_empty() {
        return Err(format!("no usable sample faces under {}", args.samples.display()).into());
    }
    recognizer.set_samples(descriptors, categories);
    log::info!("{} sample(s), {} identities", recognizer.samples_len(), labels.len());

    let mut faces = recognizer.detect(ImageSource::File(image), variant)?;
    let face = faces
        .first_mut()
        .ok_or_else(|| format!("no face found in {}", image.display()))?;
    recognizer.recognize(face)?;
    let descriptor = face
        .descriptor()
        .ok_or("recognition produced no descriptor")?;

    match recognizer.classify_with_tolerance(descriptor, args.tolerance) {
        -1 => println!("no match"),
        category => println!("{}", labels[category as usize]),
    }
    Ok(())
}

/// One category per subdirectory; every image inside contributes the
/// descriptor of its first detected face.
fn load_samples(
    recognizer: &Recognizer,
    variant: DetectorVariant,
    dir: &Path,
) -> Result<(Vec<Descriptor>, Vec<i32>, Vec<String>), Box<dyn std::error::Error>> {
    let mut descriptors = Vec::new();
    let mut categories = Vec::new();
    let mut labels = Vec::new();

    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let label = entry.file_name().to_string_lossy().into_owned();
        let category = labels.len() as i32;
        let mut added = false;

        for image in fs::read_dir(entry.path())?.filter_map(Result::ok) {
            let path = image.path();
            if !path.is_file() {
                continue;
            }
            match sample_descriptor(recognizer, variant, &path) {
                Ok(Some(descriptor)) => {
                    descriptors.push(descriptor);
                    categories.push(category);
                    added = true;
                }
                Ok(None) => log::warn!("no face in sample {}", path.display()),
                Err(e) => log::warn!("skipping sample {}: {e}", path.display()),
            }
        }

        if added {
            labels.push(label);
        }
    }
    Ok((descriptors, categories, labels))
}

fn sample_descriptor(
    recognizer: &Recognizer,
    variant: DetectorVariant,
    path: &Path,
) -> Result<Option<Descriptor>, Box<dyn std::error::Error>> {
    let mut faces = recognizer.detect(ImageSource::File(path), variant)?;
    let Some(face) = faces.first_mut() else {
        return Ok(None);
    };
    recognizer.recognize(face)?;
    Ok(face.descriptor().cloned())
}

fn run_track(
    backend: &Arc<OnnxVisionBackend>,
    variant: DetectorVariant,
    region: &str,
    frames: &[PathBuf],
) -> Result<(), Box<dyn std::error::Error>> {
    let (first, rest) = frames
        .split_first()
        .ok_or("track needs at least one frame")?;
    let region = parse_region(region)?;

    let mut tracker = Tracker::new(Arc::new(RedetectTracker::new(backend.clone(), variant)));
    tracker.start(ImageSource::File(first), region)?;

    for frame in rest {
        let confidence = tracker.update(ImageSource::File(frame))?;
        let position = tracker.position()?;
        println!(
            "{} confidence {confidence:.3} {}",
            frame.display(),
            format_rect(&position)
        );
    }
    Ok(())
}

fn parse_region(value: &str) -> Result<Rect, String> {
    let parts: Vec<i32> = value
        .split(',')
        .map(|p| p.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("invalid region '{value}', expected x0,y0,x1,y1"))?;
    match parts[..] {
        [x0, y0, x1, y1] => Ok(Rect::new(x0, y0, x1, y1)),
        _ => Err(format!("invalid region '{value}', expected x0,y0,x1,y1")),
    }
}

fn format_rect(rect: &Rect) -> String {
    format!("{},{} {}x{}", rect.x0, rect.y0, rect.width(), rect.height())
}

fn format_descriptor(descriptor: &Descriptor) -> String {
    descriptor
        .as_slice()
        .iter()
        .map(|v| format!("{v:.4}"))
        .collect::<Vec<_>>()
        .join(",")
}

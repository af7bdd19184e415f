//! End-to-end runs of the generation pipeline on the CPU backend.

use std::sync::Mutex;

use burn::backend::NdArray;
use burn::tensor::{Tensor, TensorData};
use ndarray::{Array2, Array3, Axis, stack};

use fire_vae::config::GenerationConfig;
use fire_vae::filter::postprocess;
use fire_vae::frame::pixel_ratio;
use fire_vae::model::{FireVae, FireVaeConfig};
use fire_vae::sampler::LatentDecoder;
use fire_vae::{Frame, FireVaeError, GenerationOutcome, generate_and_filter_images};

type TestBackend = NdArray;

/// Global logger that records every message so tests can assert on them.
struct CapturedLog {
    records: Mutex<Vec<(log::Level, String)>>,
}

impl log::Log for CapturedLog {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static CAPTURED_LOG: CapturedLog = CapturedLog {
    records: Mutex::new(Vec::new()),
};

fn captured_log() -> &'static CapturedLog {
    // Only the first call installs it; the rest see `SetLoggerError`.
    if log::set_logger(&CAPTURED_LOG).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
    &CAPTURED_LOG
}

impl CapturedLog {
    fn contains(&self, level: log::Level, message: &str) -> bool {
        self.records
            .lock()
            .unwrap()
            .iter()
            .any(|(l, m)| *l == level && m == message)
    }
}

/// Ignores the latent values and cycles through fixed templates, one per row.
struct TemplateDecoder {
    latent_dim: usize,
    templates: Vec<Frame>,
}

impl LatentDecoder<TestBackend> for TemplateDecoder {
    fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    fn decode(&self, z: Tensor<TestBackend, 2>) -> Tensor<TestBackend, 2> {
        let [batch, _] = z.dims();
        let frame_len = self.templates[0].len();
        let pixels: Vec<f32> = (0..batch)
            .flat_map(|i| self.templates[i % self.templates.len()].iter().copied().collect::<Vec<_>>())
            .collect();
        Tensor::from_floats(TensorData::new(pixels, vec![batch, frame_len]), &z.device())
    }
}

/// 32×32 frame with a centred-ish filled square of side `side` at (4, 4).
fn square(side: usize) -> Frame {
    Array2::from_shape_fn((32, 32), |(r, c)| {
        if (4..4 + side).contains(&r) && (4..4 + side).contains(&c) {
            1.0
        } else {
            0.0
        }
    })
}

fn small_config(num_samples: usize) -> GenerationConfig {
    GenerationConfig::new()
        .with_num_samples(num_samples)
        .with_threshold(0.5)
        .with_pixel_ratio_range((5.0, 14.0))
        .with_frame_height(32)
        .with_frame_width(32)
}

#[test]
fn all_zero_decodes_yield_no_result() {
    let device = Default::default();
    let model = TemplateDecoder {
        latent_dim: 4,
        templates: vec![Array2::zeros((256, 256))],
    };
    let observations = vec![Array2::<f32>::zeros((256, 256))];
    let config = GenerationConfig::new()
        .with_num_samples(20)
        .with_threshold(0.5)
        .with_pixel_ratio_range((5.0, 14.0));

    let outcome =
        generate_and_filter_images::<TestBackend, _, _>(&model, &observations, &config, &device).unwrap();

    assert!(matches!(outcome, GenerationOutcome::NoneInRange { generated: 20 }));
    assert!(outcome.report().is_none());
}

#[test]
fn impossible_range_is_not_an_error() {
    let device = Default::default();
    let model = TemplateDecoder {
        latent_dim: 2,
        templates: vec![square(8), square(10), square(20)],
    };
    let observations = vec![square(8)];
    let config = small_config(6).with_pixel_ratio_range((101.0, 102.0));
    let logs = captured_log();

    let outcome =
        generate_and_filter_images::<TestBackend, _, _>(&model, &observations, &config, &device).unwrap();
    assert!(matches!(outcome, GenerationOutcome::NoneInRange { generated: 6 }));
    assert!(logs.contains(log::Level::Warn, "No images meet the pixel ratio criteria."));
}

#[test]
fn in_range_samples_are_kept_in_order_and_matched() {
    let device = Default::default();
    // Sides 4 and 20 fall outside 5–14 %; 8, 10 and 12 fall inside.
    let templates = vec![square(4), square(8), square(20), square(10), square(12)];
    let model = TemplateDecoder {
        latent_dim: 3,
        templates: templates.clone(),
    };

    let expected: Vec<Frame> = [1, 3, 4].iter().map(|&i| postprocess(&templates[i], 0.5)).collect();
    for mask in &expected {
        let ratio = pixel_ratio(mask);
        assert!((5.0..=14.0).contains(&ratio), "fixture ratio {ratio}");
    }

    // The second observation is exactly the smoothed side-10 mask.
    let observations = vec![square(16), expected[1].clone(), square(2)];
    let config = small_config(templates.len()).with_num_images(2);

    let outcome =
        generate_and_filter_images::<TestBackend, _, _>(&model, &observations, &config, &device).unwrap();
    let report = outcome.into_report().expect("samples in range");

    assert_eq!(report.filtered, expected);

    assert_eq!(report.best.generated_index, 1);
    assert_eq!(report.best.observation_index, 1);
    assert_eq!(report.best.mse, 0.0);
    assert!((report.best.ssim - 1.0).abs() < 1e-9);

    assert_eq!(report.top.len(), 2);
    assert_eq!(report.top[0].index, 1);
    assert_eq!(report.top[0].mse, 0.0);
    assert!(report.top[0].mse <= report.top[1].mse);
}

#[test]
fn ranking_is_truncated_to_available_images() {
    let device = Default::default();
    let templates = vec![square(8), square(10), square(12)];
    let model = TemplateDecoder {
        latent_dim: 3,
        templates,
    };
    let observations = vec![square(9)];
    let config = small_config(3).with_num_images(50);

    let report = generate_and_filter_images::<TestBackend, _, _>(&model, &observations, &config, &device)
        .unwrap()
        .into_report()
        .unwrap();

    assert_eq!(report.top.len(), 3);
    assert!(report.top.windows(2).all(|w| w[0].mse <= w[1].mse));
}

#[test]
fn observations_can_be_a_frame_stack() {
    let device = Default::default();
    let templates = vec![square(8), square(10)];
    let model = TemplateDecoder {
        latent_dim: 2,
        templates: templates.clone(),
    };
    let target = postprocess(&templates[0], 0.5);
    let other = square(14);
    let views = [other.view(), target.view()];
    let observations: Array3<f32> = stack(Axis(0), &views).unwrap();

    let report = generate_and_filter_images::<TestBackend, _, _>(&model, &observations, &small_config(2), &device)
        .unwrap()
        .into_report()
        .unwrap();

    assert_eq!(report.best.observation_index, 1);
    assert_eq!(report.best.observation, target);
}

#[test]
fn mismatched_decoder_output_is_fatal() {
    let device = Default::default();
    let model = TemplateDecoder {
        latent_dim: 2,
        templates: vec![Array2::zeros((16, 16))],
    };
    let observations = vec![square(8)];

    let err = generate_and_filter_images::<TestBackend, _, _>(&model, &observations, &small_config(4), &device)
        .unwrap_err();
    assert!(matches!(err, FireVaeError::Shape { .. }));
}

#[test]
fn constant_masks_never_produce_a_best_match() {
    // Every sample saturates to all ones: ratio 100 %, zero dynamic range.
    let device = Default::default();
    let vae_config = FireVaeConfig::new()
        .with_input_dim(16 * 16)
        .with_hidden_dims(vec![32])
        .with_latent_dim(4);
    let model = FireVae::<TestBackend>::new(&vae_config, &device);
    let observations = vec![Array2::<f32>::ones((16, 16))];
    let config = GenerationConfig::new()
        .with_num_samples(5)
        .with_threshold(-1.0)
        .with_pixel_ratio_range((0.0, 100.0))
        .with_frame_height(16)
        .with_frame_width(16);

    let err = generate_and_filter_images::<TestBackend, _, _>(&model, &observations, &config, &device)
        .unwrap_err();
    assert!(matches!(err, FireVaeError::NoBestMatch));
}

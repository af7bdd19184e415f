use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{Tensor, TensorData, backend::Backend},
};
use ndarray::{Array3, ArrayView2, Axis, s};

use std::marker::PhantomData;

use crate::Frame;
use crate::error::{FireVaeError, FireVaeResult};

// --- Observation access ---

/// Read-only, indexable collection of observed fire frames.
pub trait ObservationSet {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame at `index`, or `None` past the end.
    fn frame(&self, index: usize) -> Option<ArrayView2<'_, f32>>;
}

impl ObservationSet for [Frame] {
    fn len(&self) -> usize {
        <[Frame]>::len(self)
    }

    fn frame(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        self.get(index).map(|f| f.view())
    }
}

impl ObservationSet for Vec<Frame> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn frame(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        self.as_slice().frame(index)
    }
}

/// A `[frames, height, width]` stack.
impl ObservationSet for Array3<f32> {
    fn len(&self) -> usize {
        self.len_of(Axis(0))
    }

    fn frame(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.len_of(Axis(0))).then(|| self.index_axis(Axis(0), index))
    }
}

// --- Batching ---

/// Packs frames into a flattened `[batch, height * width]` tensor.
///
/// Frames are expected to be normalized to `[0.0, 1.0]` already; they are
/// flattened row-major, the layout the dense decoder emits.
#[derive(Clone)]
pub struct FrameBatcher<B: Backend> {
    _b: PhantomData<B>,
}

impl<B: Backend> FrameBatcher<B> {
    pub fn new() -> Self {
        Self { _b: PhantomData }
    }
}

impl<B: Backend> Default for FrameBatcher<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Batcher<B, Frame, Tensor<B, 2>> for FrameBatcher<B> {
    /// # Panics
    ///
    /// If the frames in one batch do not share a shape.
    fn batch(&self, items: Vec<Frame>, device: &B::Device) -> Tensor<B, 2> {
        let batch_size = items.len();
        let frame_len = items.first().map_or(0, |f| f.len());
        assert!(
            items.iter().all(|f| f.len() == frame_len),
            "frames in a batch must share a shape"
        );

        let pixels: Vec<f32> = items.iter().flat_map(|f| f.iter().copied()).collect();

        Tensor::from_floats(TensorData::new(pixels, vec![batch_size, frame_len]), device)
    }
}

// --- Sequential splitting ---

/// Keeps every `sequence_jump`-th frame of a `[frames, height, width]` stack.
///
/// A jump of zero is treated as one.
pub fn sequential_undersample(frames: &Array3<f32>, sequence_jump: usize, print: bool) -> Array3<f32> {
    let jump = sequence_jump.max(1) as isize;
    let undersampled = frames.slice(s![..;jump, .., ..]).to_owned();

    if print {
        log::info!("(undersampled) data info: {:?}", undersampled.dim());
    }

    undersampled
}

/// Validation indices for [`sequential_train_val_split`].
///
/// Starts at `sequence_jump * start_offset + 1` and advances by
/// `sequence_jump * jump_multiplier` while below `len`.
pub fn validation_indices(
    len: usize,
    sequence_jump: usize,
    start_offset: usize,
    jump_multiplier: usize,
) -> FireVaeResult<Vec<usize>> {
    let step = sequence_jump * jump_multiplier;
    if step == 0 {
        return Err(FireVaeError::InvalidArgument(
            "sequence_jump * jump_multiplier must be positive".into(),
        ));
    }
    let start = sequence_jump * start_offset + 1;
    Ok((start..len).step_by(step).collect())
}

/// Splits a sequential stack into training and validation frames.
///
/// Validation frames are picked at regular intervals (see
/// [`validation_indices`]); everything else, in order, is training data.
/// Returns `(train, val)`.
pub fn sequential_train_val_split(
    frames: &Array3<f32>,
    sequence_jump: usize,
    start_offset: usize,
    jump_multiplier: usize,
    print: bool,
) -> FireVaeResult<(Array3<f32>, Array3<f32>)> {
    let len = frames.len_of(Axis(0));
    let val_idx = validation_indices(len, sequence_jump, start_offset, jump_multiplier)?;
    let train_idx: Vec<usize> = (0..len).filter(|i| val_idx.binary_search(i).is_err()).collect();

    let train = frames.select(Axis(0), &train_idx);
    let val = frames.select(Axis(0), &val_idx);

    if print {
        log::info!("(split) data info (w/ jump={})", sequence_jump);
        log::info!("train: {:?}", train.dim());
        log::info!("val: {:?}", val.dim());
    }

    Ok((train, val))
}

// ============================================================
// Layer 5: Epoch Runner
// ============================================================
// One epoch = one training pass + one evaluation pass.
//
// Training pass, per batch:
//   1. move the batch to the device, transpose to time-major
//   2. forward with the carried (detached) hidden state
//   3. loss → backward → gradients
//   4. clip the global gradient norm to `clip_norm`
//   5. optimizer step at the scheduler's current rate
//   6. scheduler step
//   7. accumulate loss and accuracy
//
// Evaluation pass: same traversal on the inner (non-autodiff)
// backend. The model it receives has no autodiff graph, so it
// cannot produce gradients or be updated.
//
// Both passes start from a zeroed hidden state and report the
// per-batch mean of loss and accuracy.

use anyhow::{ensure, Result};
use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};

use crate::data::{batcher::SequenceBatch, dataloader::BatchSource};
use crate::domain::{
    metrics::{EpochMetrics, MetricAccumulator, PassMetrics},
    mode::Mode,
    traits::LrScheduler,
};
use crate::ml::{
    clip::clip_grad_norm,
    model::SequenceModel,
    objective::{Accuracy, Criterion, CrossEntropy, Metric},
};

/// Default bound on the global gradient norm.
pub const DEFAULT_CLIP_NORM: f64 = 0.25;

/// Hidden state carried from one batch to the next within a pass.
///
/// Stored detached, so backpropagation never reaches into an
/// earlier batch. Re-initialised when the batch size changes.
struct RecurrentState<B: Backend> {
    hidden: Option<Tensor<B, 3>>,
}

impl<B: Backend> RecurrentState<B> {
    fn new() -> Self {
        Self { hidden: None }
    }

    fn take<M: SequenceModel<B>>(&mut self, model: &M, batch_size: usize, device: &B::Device) -> Tensor<B, 3> {
        match self.hidden.take() {
            Some(h) if h.dims()[1] == batch_size => h,
            _ => model.init_hidden(batch_size, device),
        }
    }

    fn keep(&mut self, hidden: Tensor<B, 3>) {
        self.hidden = Some(hidden.detach());
    }
}

pub struct EpochRunner<C = CrossEntropy, A = Accuracy> {
    criterion: C,
    metric:    A,
    clip_norm: f64,
}

impl Default for EpochRunner {
    fn default() -> Self {
        Self::new(CrossEntropy, Accuracy)
    }
}

impl<C: Criterion, A: Metric> EpochRunner<C, A> {
    pub fn new(criterion: C, metric: A) -> Self {
        Self { criterion, metric, clip_norm: DEFAULT_CLIP_NORM }
    }

    pub fn with_clip_norm(mut self, clip_norm: f64) -> Self {
        self.clip_norm = clip_norm;
        self
    }

    pub fn clip_norm(&self) -> f64 {
        self.clip_norm
    }

    /// One training traversal of `train_data`.
    ///
    /// Takes the model by value and hands back the updated one,
    /// together with the mean loss and accuracy over all batches.
    /// The scheduler is stepped exactly once per batch.
    ///
    /// Fails before touching the model when the source has no
    /// batches or the clip bound is not a positive number.
    pub fn train_pass<B, M, O, S, L>(
        &self,
        mut model:  M,
        optim:      &mut O,
        train_data: &L,
        scheduler:  &mut S,
        device:     &B::Device,
    ) -> Result<(M, PassMetrics)>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B> + SequenceModel<B>,
        O: Optimizer<M, B>,
        S: LrScheduler + ?Sized,
        L: BatchSource<B>,
    {
        ensure!(
            self.clip_norm.is_finite() && self.clip_norm > 0.0,
            "clip_norm must be a positive finite number, got {}",
            self.clip_norm
        );
        let num_batches = train_data.num_batches();
        ensure!(num_batches > 0, "training data yielded no batches");

        let progress = progress_bar(num_batches, Mode::Train)?;
        let mut state = RecurrentState::<B>::new();
        let mut acc   = MetricAccumulator::new();

        for (index, batch) in train_data.iter().enumerate() {
            let SequenceBatch { inputs, targets } = batch.to_device(device);
            // [batch, seq] → [seq, batch]
            let inputs = inputs.swap_dims(0, 1);
            let batch_size = targets.dims()[0];

            let hidden = state.take(&model, batch_size, device);
            let (logits, hidden) = model.forward(inputs, hidden, Mode::Train);
            state.keep(hidden);

            let loss     = self.criterion.loss(logits.clone(), targets.clone());
            let accuracy = self.metric.compute(logits, targets);
            let loss_val = loss.clone().into_scalar().elem::<f64>();

            // Burn hands out fresh gradients on every backward, so
            // there is nothing to zero between steps.
            let mut grads = GradientsParams::from_grads(loss.backward(), &model);
            let grad_norm = clip_grad_norm::<B, M>(&model, &mut grads, self.clip_norm);

            let lr = scheduler.current_lr();
            model = optim.step(lr, model, grads);
            scheduler.step();

            acc.add(loss_val, accuracy);
            tracing::debug!(
                batch = index,
                loss = loss_val,
                accuracy,
                grad_norm,
                lr,
                "train batch"
            );
            progress.set_message(format!("loss {loss_val:.4}"));
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok((model, acc.finish()?))
    }

    /// One evaluation traversal of `val_data`.
    ///
    /// `model` lives on a plain backend, typically obtained with
    /// `AutodiffModule::valid()`. Nothing here can change it.
    pub fn eval_pass<B, M, L>(&self, model: &M, val_data: &L, device: &B::Device) -> Result<PassMetrics>
    where
        B: Backend,
        M: SequenceModel<B>,
        L: BatchSource<B>,
    {
        let num_batches = val_data.num_batches();
        ensure!(num_batches > 0, "validation data yielded no batches");

        let progress = progress_bar(num_batches, Mode::Eval)?;
        let mut state = RecurrentState::<B>::new();
        let mut acc   = MetricAccumulator::new();

        for batch in val_data.iter() {
            let SequenceBatch { inputs, targets } = batch.to_device(device);
            let inputs = inputs.swap_dims(0, 1);
            let batch_size = targets.dims()[0];

            let hidden = state.take(model, batch_size, device);
            let (logits, hidden) = model.forward(inputs, hidden, Mode::Eval);
            state.keep(hidden);

            let loss = self.criterion
                .loss(logits.clone(), targets.clone())
                .into_scalar()
                .elem::<f64>();
            acc.add(loss, self.metric.compute(logits, targets));
            progress.inc(1);
        }
        progress.finish_and_clear();

        acc.finish()
    }

    /// Train on `train_data`, evaluate on `val_data`, print the
    /// summary line and return the updated model with both results.
    pub fn run_epoch<B, M, O, S, LT, LV>(
        &self,
        model:      M,
        optim:      &mut O,
        train_data: &LT,
        val_data:   &LV,
        scheduler:  &mut S,
        device:     &B::Device,
    ) -> Result<(M, EpochMetrics)>
    where
        B: AutodiffBackend,
        M: AutodiffModule<B> + SequenceModel<B>,
        M::InnerModule: SequenceModel<B::InnerBackend>,
        O: Optimizer<M, B>,
        S: LrScheduler + ?Sized,
        LT: BatchSource<B>,
        LV: BatchSource<B::InnerBackend>,
    {
        ensure!(val_data.num_batches() > 0, "validation data yielded no batches");

        let (model, train) = self.train_pass(model, optim, train_data, scheduler, device)?;
        let val = self.eval_pass::<B::InnerBackend, _, _>(&model.valid(), val_data, device)?;

        let metrics = EpochMetrics::new(train, val);
        println!("{metrics}");
        Ok((model, metrics))
    }
}

fn progress_bar(len: usize, mode: Mode) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:>5} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>5}/{len:5} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_prefix(mode.to_string());
    Ok(pb)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
        module::{Module, ModuleVisitor, Param},
        optim::AdamConfig,
    };

    use crate::data::{
        batcher::SequenceBatcher,
        dataloader::BatchLoader,
        dataset::{SequenceDataset, SequenceSample},
    };
    use crate::ml::clip::grad_norm;
    use crate::ml::model::{RecurrentClassifier, RecurrentClassifierConfig};
    use crate::ml::scheduler::ConstantLr;

    type Inner = NdArray;
    type TestBackend = Autodiff<Inner>;

    /// Counts how often it is stepped.
    struct CountingLr {
        lr:    f64,
        steps: usize,
    }

    impl LrScheduler for CountingLr {
        fn current_lr(&self) -> f64 {
            self.lr
        }

        fn step(&mut self) {
            self.steps += 1;
        }
    }

    /// Wraps an optimizer and records the global norm of every
    /// gradient set it is asked to apply.
    #[derive(Clone)]
    struct Recording<O> {
        inner: O,
        norms: Vec<f64>,
    }

    impl<O, M, B> Optimizer<M, B> for Recording<O>
    where
        O: Optimizer<M, B> + Clone,
        M: AutodiffModule<B>,
        B: AutodiffBackend,
    {
        type Record = O::Record;

        fn step(&mut self, lr: f64, module: M, grads: GradientsParams) -> M {
            self.norms.push(grad_norm::<B, M>(&module, &grads));
            self.inner.step(lr, module, grads)
        }

        fn to_record(&self) -> Self::Record {
            self.inner.to_record()
        }

        fn load_record(self, record: Self::Record) -> Self {
            Self { inner: self.inner.load_record(record), norms: self.norms }
        }
    }

    /// Flattens every float parameter of a module.
    struct Snapshot(Vec<f32>);

    impl<B: Backend> ModuleVisitor<B> for Snapshot {
        fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
            self.0.extend(param.val().to_data().iter::<f32>());
        }
    }

    fn params<B: Backend, M: Module<B>>(model: &M) -> Vec<f32> {
        let mut snapshot = Snapshot(Vec::new());
        model.visit(&mut snapshot);
        snapshot.0
    }

    fn device() -> NdArrayDevice {
        NdArrayDevice::default()
    }

    fn model() -> RecurrentClassifier<TestBackend> {
        RecurrentClassifierConfig::new(12, 2, 4, 6, 1, 0.0).init(&device())
    }

    fn adam<B: AutodiffBackend, M: AutodiffModule<B>>() -> impl Optimizer<M, B> {
        AdamConfig::new().with_epsilon(1e-8).init()
    }

    fn dataset(n: usize) -> SequenceDataset {
        SequenceDataset::new(
            (0..n)
                .map(|i| {
                    let tokens = (0..=i % 4).map(|t| (t + i) as u32 % 10 + 2).collect();
                    SequenceSample::new(tokens, i % 2)
                })
                .collect(),
        )
    }

    /// 7 samples in batches of 3 → 3 batches (3, 3, 1).
    fn loader<B: Backend>(n: usize) -> BatchLoader<B> {
        BatchLoader::new(dataset(n), SequenceBatcher::new(5), 3, Default::default())
    }

    #[test]
    fn test_scheduler_steps_once_per_batch() {
        let runner = EpochRunner::default();
        let data   = loader::<TestBackend>(7);
        let mut sched = CountingLr { lr: 1e-2, steps: 0 };
        let mut optim = adam();

        let (_, metrics) = runner
            .train_pass(model(), &mut optim, &data, &mut sched, &device())
            .unwrap();

        assert_eq!(data.num_batches(), 3);
        assert_eq!(sched.steps, 3);
        assert_eq!(metrics.batches, 3);
        assert!(metrics.loss.is_finite());
        assert!((0.0..=1.0).contains(&metrics.accuracy));
    }

    #[test]
    fn test_train_pass_updates_parameters() {
        let runner = EpochRunner::default();
        let model  = model();
        let before = params(&model);

        let (model, _) = runner
            .train_pass(model, &mut adam(), &loader::<TestBackend>(7), &mut ConstantLr(1e-2), &device())
            .unwrap();

        assert_ne!(params(&model), before);
    }

    #[test]
    fn test_optimizer_only_sees_clipped_gradients() {
        let clip_norm = 1e-4;
        let runner = EpochRunner::default().with_clip_norm(clip_norm);
        let mut optim = Recording {
            inner: AdamConfig::new()
                .with_epsilon(1e-8)
                .init::<TestBackend, RecurrentClassifier<TestBackend>>(),
            norms: Vec::new(),
        };

        runner
            .train_pass(model(), &mut optim, &loader::<TestBackend>(7), &mut ConstantLr(1e-2), &device())
            .unwrap();

        assert_eq!(optim.norms.len(), 3);
        for norm in &optim.norms {
            assert!(*norm > 0.0);
            assert!(*norm <= clip_norm * (1.0 + 1e-4), "optimizer saw norm {norm} above {clip_norm}");
        }
    }

    #[test]
    fn test_eval_pass_leaves_parameters_unchanged() {
        let runner = EpochRunner::default();
        let model  = model().valid();
        let before = params(&model);

        runner.eval_pass(&model, &loader::<Inner>(7), &device()).unwrap();
        assert_eq!(params(&model), before);
    }

    #[test]
    fn test_eval_pass_is_deterministic() {
        let runner = EpochRunner::default();
        let model  = model().valid();
        let data   = loader::<Inner>(7);

        let a = runner.eval_pass(&model, &data, &device()).unwrap();
        let b = runner.eval_pass(&model, &data, &device()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_eval_means_match_reference() {
        let runner = EpochRunner::default();
        let model  = model().valid();
        let data   = loader::<Inner>(7);
        let device = device();

        let mut losses = Vec::new();
        let mut accs   = Vec::new();
        let mut hidden: Option<Tensor<Inner, 3>> = None;
        for batch in data.iter() {
            let n = batch.batch_size();
            let h = match hidden.take() {
                Some(h) if h.dims()[1] == n => h,
                _ => model.init_hidden(n, &device),
            };
            let (logits, h) = model.forward(batch.inputs.swap_dims(0, 1), h, Mode::Eval);
            hidden = Some(h);
            losses.push(
                CrossEntropy.loss(logits.clone(), batch.targets.clone()).into_scalar().elem::<f64>(),
            );
            accs.push(Accuracy.compute(logits, batch.targets));
        }

        let m = runner.eval_pass(&model, &data, &device).unwrap();
        let ref_loss = losses.iter().sum::<f64>() / losses.len() as f64;
        let ref_acc  = accs.iter().sum::<f64>() / accs.len() as f64;
        assert!((m.loss - ref_loss).abs() < 1e-6);
        assert!((m.accuracy - ref_acc).abs() < 1e-12);
    }

    #[test]
    fn test_empty_training_data_fails_before_any_step() {
        let runner = EpochRunner::default();
        let model  = model();
        let before = params(&model);
        let mut sched = CountingLr { lr: 1e-2, steps: 0 };

        let result = runner.train_pass(
            model.clone(), &mut adam(), &loader::<TestBackend>(0), &mut sched, &device(),
        );

        assert!(result.is_err());
        assert_eq!(sched.steps, 0);
        assert_eq!(params(&model), before);
    }

    #[test]
    fn test_empty_validation_data_fails() {
        let runner = EpochRunner::default();
        let model  = model().valid();
        assert!(runner.eval_pass(&model, &loader::<Inner>(0), &device()).is_err());
    }

    #[test]
    fn test_non_positive_clip_norm_rejected() {
        let runner = EpochRunner::default().with_clip_norm(0.0);
        let mut sched = CountingLr { lr: 1e-2, steps: 0 };

        let result = runner.train_pass(
            model(), &mut adam(), &loader::<TestBackend>(7), &mut sched, &device(),
        );

        assert!(result.is_err());
        assert_eq!(sched.steps, 0);
    }

    #[test]
    fn test_run_epoch_reports_both_passes() {
        let runner = EpochRunner::default();
        assert_eq!(runner.clip_norm(), DEFAULT_CLIP_NORM);

        let train = loader::<TestBackend>(7);
        let val   = loader::<Inner>(4);
        let mut sched = CountingLr { lr: 1e-2, steps: 0 };

        let (_, metrics) = runner
            .run_epoch(model(), &mut adam(), &train, &val, &mut sched, &device())
            .unwrap();

        assert_eq!(metrics.train.batches, 3);
        assert_eq!(metrics.val.batches, 2);
        assert_eq!(sched.steps, 3);
    }

    #[test]
    fn test_run_epoch_checks_validation_before_training() {
        let runner = EpochRunner::default();
        let mut sched = CountingLr { lr: 1e-2, steps: 0 };

        let result = runner.run_epoch(
            model(), &mut adam(), &loader::<TestBackend>(7), &loader::<Inner>(0),
            &mut sched, &device(),
        );

        assert!(result.is_err());
        assert_eq!(sched.steps, 0);
    }
}

use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

use crate::domain::mode::Mode;

/// Contract between a recurrent model and the epoch runner.
///
/// The hidden state is an explicit value shaped
/// `[layers, batch, hidden]`. The runner owns it between batches,
/// so "resetting" is just asking for a fresh one.
pub trait SequenceModel<B: Backend> {
    /// Zeroed recurrent state for `batch_size` sequences.
    fn init_hidden(&self, batch_size: usize, device: &B::Device) -> Tensor<B, 3>;

    /// `inputs` are time-major token ids `[seq, batch]`.
    /// Returns logits `[batch, classes]` and the state after the last step.
    fn forward(
        &self,
        inputs: Tensor<B, 2, Int>,
        hidden: Tensor<B, 3>,
        mode:   Mode,
    ) -> (Tensor<B, 2>, Tensor<B, 3>);
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize,
// so they are not derived again here.
#[derive(Config, Debug)]
pub struct RecurrentClassifierConfig {
    pub vocab_size:  usize,
    pub num_classes: usize,
    pub embed_dim:   usize,
    pub hidden_size: usize,
    pub num_layers:  usize,
    pub dropout:     f64,
}

impl RecurrentClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentClassifier<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device);
        let layers: Vec<GruLayer<B>> = (0..self.num_layers.max(1))
            .map(|i| {
                let input_size = if i == 0 { self.embed_dim } else { self.hidden_size };
                GruLayer::new(input_size, self.hidden_size, device)
            })
            .collect();
        let head    = LinearConfig::new(self.hidden_size, self.num_classes).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        RecurrentClassifier {
            embedding, layers, head, dropout,
            hidden_size: self.hidden_size,
        }
    }
}

/// One GRU layer. Gate pre-activations for reset, update and
/// candidate are packed side by side: `[r | z | n]`.
#[derive(Module, Debug)]
pub struct GruLayer<B: Backend> {
    pub input_gates:  Linear<B>,
    pub hidden_gates: Linear<B>,
    pub hidden_size:  usize,
}

impl<B: Backend> GruLayer<B> {
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            input_gates:  LinearConfig::new(input_size, 3 * hidden_size).init(device),
            hidden_gates: LinearConfig::new(hidden_size, 3 * hidden_size).init(device),
            hidden_size,
        }
    }

    /// x: [batch, input], h: [batch, hidden] → [batch, hidden]
    pub fn step(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = h.dims();
        let hs = self.hidden_size;

        let gi = self.input_gates.forward(x);
        let gh = self.hidden_gates.forward(h.clone());

        let reset = activation::sigmoid(
            gi.clone().slice([0..batch, 0..hs]) + gh.clone().slice([0..batch, 0..hs]),
        );
        let update = activation::sigmoid(
            gi.clone().slice([0..batch, hs..2 * hs]) + gh.clone().slice([0..batch, hs..2 * hs]),
        );
        let candidate = (gi.slice([0..batch, 2 * hs..3 * hs])
            + reset * gh.slice([0..batch, 2 * hs..3 * hs]))
            .tanh();

        // h' = (1 - z) * n + z * h
        update.clone().neg().add_scalar(1.0) * candidate + update * h
    }
}

#[derive(Module, Debug)]
pub struct RecurrentClassifier<B: Backend> {
    pub embedding:   Embedding<B>,
    pub layers:      Vec<GruLayer<B>>,
    pub head:        Linear<B>,
    pub dropout:     Dropout,
    pub hidden_size: usize,
}

impl<B: Backend> RecurrentClassifier<B> {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    fn regularize<const D: usize>(&self, x: Tensor<B, D>, mode: Mode) -> Tensor<B, D> {
        if mode.is_train() {
            self.dropout.forward(x)
        } else {
            x
        }
    }
}

impl<B: Backend> SequenceModel<B> for RecurrentClassifier<B> {
    fn init_hidden(&self, batch_size: usize, device: &B::Device) -> Tensor<B, 3> {
        Tensor::zeros([self.layers.len(), batch_size, self.hidden_size], device)
    }

    fn forward(
        &self,
        inputs: Tensor<B, 2, Int>,
        hidden: Tensor<B, 3>,
        mode:   Mode,
    ) -> (Tensor<B, 2>, Tensor<B, 3>) {
        let [seq_len, batch] = inputs.dims();
        let hs = self.hidden_size;

        // [seq, batch] → [seq, batch, embed]
        let embedded = self.regularize(self.embedding.forward(inputs), mode);
        let [_, _, embed_dim] = embedded.dims();

        let mut states: Vec<Tensor<B, 2>> = (0..self.layers.len())
            .map(|l| hidden.clone().slice([l..l + 1, 0..batch, 0..hs]).reshape([batch, hs]))
            .collect();

        let last = self.layers.len() - 1;
        for t in 0..seq_len {
            let mut x = embedded
                .clone()
                .slice([t..t + 1, 0..batch, 0..embed_dim])
                .reshape([batch, embed_dim]);

            for (l, layer) in self.layers.iter().enumerate() {
                let h = layer.step(x, states[l].clone());
                states[l] = h.clone();
                x = if l < last { self.regularize(h, mode) } else { h };
            }
        }

        let logits = self.head.forward(self.regularize(states[last].clone(), mode));

        let next_hidden = Tensor::cat(
            states.into_iter().map(|s| s.unsqueeze::<3>()).collect(),
            0,
        );

        (logits, next_hidden)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny(layers: usize) -> RecurrentClassifier<TestBackend> {
        RecurrentClassifierConfig::new(16, 3, 4, 5, layers, 0.5).init(&Default::default())
    }

    fn time_major(seq: usize, batch: usize) -> Tensor<TestBackend, 2, Int> {
        let ids: Vec<i32> = (0..(seq * batch) as i32).map(|i| i % 16).collect();
        Tensor::<TestBackend, 1, Int>::from_ints(ids.as_slice(), &Default::default())
            .reshape([seq, batch])
    }

    #[test]
    fn test_forward_shapes() {
        let model  = tiny(2);
        let device = Default::default();
        assert_eq!(model.num_layers(), 2);

        let hidden = model.init_hidden(3, &device);
        assert_eq!(hidden.dims(), [2, 3, 5]);

        let (logits, next) = model.forward(time_major(7, 3), hidden, Mode::Eval);
        assert_eq!(logits.dims(), [3, 3]);
        assert_eq!(next.dims(), [2, 3, 5]);
    }

    #[test]
    fn test_zero_layers_still_builds_one() {
        assert_eq!(tiny(0).num_layers(), 1);
    }

    #[test]
    fn test_eval_forward_is_deterministic() {
        let model  = tiny(1);
        let device = Default::default();

        let (a, _) = model.forward(time_major(4, 2), model.init_hidden(2, &device), Mode::Eval);
        let (b, _) = model.forward(time_major(4, 2), model.init_hidden(2, &device), Mode::Eval);
        let a: Vec<f32> = a.to_data().iter::<f32>().collect();
        let b: Vec<f32> = b.to_data().iter::<f32>().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hidden_state_changes_output() {
        let model  = tiny(1);
        let device = Default::default();

        let (_, carried) = model.forward(time_major(4, 2), model.init_hidden(2, &device), Mode::Eval);
        let (fresh, _)   = model.forward(time_major(3, 2), model.init_hidden(2, &device), Mode::Eval);
        let (warm, _)    = model.forward(time_major(3, 2), carried, Mode::Eval);

        let fresh: Vec<f32> = fresh.to_data().iter::<f32>().collect();
        let warm:  Vec<f32> = warm.to_data().iter::<f32>().collect();
        assert_ne!(fresh, warm);
    }
}

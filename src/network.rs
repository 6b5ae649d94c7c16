use crate::{Error, Layer, MomentumSgd, Result};

/// An ordered pipeline of layers.
///
/// For multi-label use the final layer emits `2 * num_labels` values: for label
/// `j`, slot `2j` is the "negative" unit and slot `2j + 1` the "positive" unit.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// Chain pre-built layers. Each layer's `in_dim` must match the previous `out_dim`.
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::InvalidConfig(
                "network must have at least one layer".to_owned(),
            ));
        }
        for (idx, pair) in layers.windows(2).enumerate() {
            if pair[1].in_dim() != pair[0].out_dim() {
                return Err(Error::InvalidShape(format!(
                    "layer {} in_dim {} does not match layer {idx} out_dim {}",
                    idx + 1,
                    pair[1].in_dim(),
                    pair[0].out_dim()
                )));
            }
        }
        Ok(Self { layers })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layers[0].in_dim()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].out_dim()
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut Layer> {
        self.layers.get_mut(idx)
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Change learning rate and momentum for every layer.
    pub fn set_sgd(&mut self, sgd: MomentumSgd) -> Result<()> {
        sgd.validate()?;
        for layer in &mut self.layers {
            layer.set_sgd(sgd);
        }
        Ok(())
    }

    /// Training forward pass for a single sample.
    ///
    /// Every layer caches its intermediate values for the following `backward`.
    ///
    /// Panics if `input.len() != self.input_dim()`.
    pub fn forward(&mut self, input: &[f64]) -> &[f64] {
        assert_eq!(
            input.len(),
            self.input_dim(),
            "input len {} does not match network input_dim {}",
            input.len(),
            self.input_dim()
        );

        for idx in 0..self.layers.len() {
            if idx == 0 {
                self.layers[0].forward(input);
            } else {
                // Borrow the previous layer immutably and the current one mutably.
                let (left, right) = self.layers.split_at_mut(idx);
                right[0].forward(left[idx - 1].output());
            }
        }

        self.output()
    }

    /// Output of the most recent training forward pass.
    #[inline]
    pub fn output(&self) -> &[f64] {
        self.layers[self.layers.len() - 1].output()
    }

    /// Back-propagate from the final layer, seeded with `target - output`.
    ///
    /// You must call `forward` first. Weights are updated layer by layer.
    pub fn backward(&mut self, target: &[f64]) {
        let seed = self.layers[self.layers.len() - 1].last_layer_error(target);
        self.propagate(&seed);
    }

    /// Like [`Network::backward`] for a `2 * num_labels` output, but labels with
    /// `known[label] == false` get a zero seed error on both of their units.
    pub fn backward_masked(&mut self, target: &[f64], known: &[bool]) {
        assert_eq!(
            known.len() * 2,
            self.output_dim(),
            "known mask len {} does not cover output_dim {}",
            known.len(),
            self.output_dim()
        );

        let mut seed = self.layers[self.layers.len() - 1].last_layer_error(target);
        for (pair, &k) in seed.chunks_exact_mut(2).zip(known) {
            if !k {
                pair.fill(0.0);
            }
        }
        self.propagate(&seed);
    }

    fn propagate(&mut self, seed: &[f64]) {
        let last = self.layers.len() - 1;
        for idx in (0..self.layers.len()).rev() {
            if idx == last {
                self.layers[idx].backward(seed);
            } else {
                // The next layer's input error becomes this layer's output error.
                let (left, right) = self.layers.split_at_mut(idx + 1);
                left[idx].backward(right[0].input_error());
            }
        }
    }

    /// Side-effect-free forward pass. Safe to run from shared references.
    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_dim() {
            return Err(Error::InvalidShape(format!(
                "input len {} does not match network input_dim {}",
                input.len(),
                self.input_dim()
            )));
        }

        let mut signal = input.to_vec();
        for layer in &self.layers {
            let mut out = vec![0.0; layer.out_dim()];
            layer.infer(&signal, &mut out);
            signal = out;
        }
        Ok(signal)
    }
}

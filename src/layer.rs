//! Network layers.
//!
//! A [`Layer`] is either a dense [`FullyConnected`] layer or a [`Parallel`]
//! layer made of independent dense blocks laid side by side. Both share the
//! same per-block math (`affine` + `dense_backward`), so a parallel block is
//! trained exactly like a small fully-connected layer on its slice of the input.
//!
//! Weights include a bias row: a dense block with `in_dim` inputs and `out_dim`
//! outputs stores a row-major `(in_dim + 1, out_dim)` matrix whose last row
//! multiplies a constant input of 1. Parallel layers store their blocks
//! back to back (block-major).
//!
//! Training forward passes cache the input, pre-activation and post-activation
//! values inside the layer; `backward` consumes that cache and updates the
//! weights immediately with momentum SGD. Shape mismatches on this path are
//! programmer errors and panic.

use rand::Rng;

use crate::{Activation, Error, MomentumSgd, Result};

#[derive(Debug, Clone)]
struct Cache {
    input: Vec<f64>,
    pre: Vec<f64>,
    post: Vec<f64>,
    d_pre: Vec<f64>,
    d_input: Vec<f64>,
}

impl Cache {
    fn new(in_dim: usize, out_dim: usize) -> Self {
        Self {
            input: vec![0.0; in_dim],
            pre: vec![0.0; out_dim],
            post: vec![0.0; out_dim],
            d_pre: vec![0.0; out_dim],
            d_input: vec![0.0; in_dim],
        }
    }
}

/// A dense layer: `in_dim` inputs, `out_dim` outputs.
#[derive(Debug, Clone)]
pub struct FullyConnected {
    in_dim: usize,
    out_dim: usize,
    activation: Activation,
    sgd: MomentumSgd,
    /// Row-major `(in_dim + 1, out_dim)`; the last row is the bias.
    weights: Vec<f64>,
    deltas: Vec<f64>,
    cache: Cache,
}

/// `parts` independent dense blocks, each mapping `part_in` inputs to
/// `part_out` outputs. Block `p` reads `input[p * part_in..(p + 1) * part_in]`
/// and writes `output[p * part_out..(p + 1) * part_out]`.
#[derive(Debug, Clone)]
pub struct Parallel {
    parts: usize,
    part_in: usize,
    part_out: usize,
    activation: Activation,
    sgd: MomentumSgd,
    /// Block-major `(parts, part_in + 1, part_out)`.
    weights: Vec<f64>,
    deltas: Vec<f64>,
    cache: Cache,
}

#[derive(Debug, Clone)]
pub enum Layer {
    FullyConnected(FullyConnected),
    Parallel(Parallel),
}

fn validate_common(activation: Activation, sgd: &MomentumSgd) -> Result<()> {
    activation.validate()?;
    sgd.validate()
}

fn validate_weights(weights: &[f64], expected: usize) -> Result<()> {
    if weights.len() != expected {
        return Err(Error::InvalidShape(format!(
            "weights length {} does not match expected {expected}",
            weights.len()
        )));
    }
    if weights.iter().any(|w| !w.is_finite()) {
        return Err(Error::InvalidData(
            "weights must contain only finite values".to_owned(),
        ));
    }
    Ok(())
}

impl FullyConnected {
    /// Weights are drawn uniformly from `[0, 1)`.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        sgd: MomentumSgd,
        rng: &mut R,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        let weights = (0..(in_dim + 1) * out_dim)
            .map(|_| rng.gen_range(0.0..1.0))
            .collect();
        Self::from_parts(in_dim, out_dim, activation, sgd, weights)
    }

    /// Build from explicit weights (row-major `(in_dim + 1, out_dim)`).
    pub fn from_parts(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        sgd: MomentumSgd,
        weights: Vec<f64>,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        validate_common(activation, &sgd)?;
        validate_weights(&weights, (in_dim + 1) * out_dim)?;

        Ok(Self {
            in_dim,
            out_dim,
            activation,
            sgd,
            deltas: vec![0.0; weights.len()],
            weights,
            cache: Cache::new(in_dim, out_dim),
        })
    }

    /// Weight from input `row` (or the bias when `row == in_dim`) to output `col`.
    pub fn weight(&self, row: usize, col: usize) -> Option<f64> {
        if row > self.in_dim || col >= self.out_dim {
            return None;
        }
        Some(self.weights[row * self.out_dim + col])
    }
}

impl Parallel {
    /// Weights are drawn uniformly from `[0, 1)`.
    pub fn new_with_rng<R: Rng + ?Sized>(
        parts: usize,
        part_in: usize,
        part_out: usize,
        activation: Activation,
        sgd: MomentumSgd,
        rng: &mut R,
    ) -> Result<Self> {
        if parts == 0 || part_in == 0 || part_out == 0 {
            return Err(Error::InvalidConfig(format!(
                "parallel layer dims must be > 0, got parts={parts} part_in={part_in} part_out={part_out}"
            )));
        }
        let weights = (0..parts * (part_in + 1) * part_out)
            .map(|_| rng.gen_range(0.0..1.0))
            .collect();
        Self::from_parts(parts, part_in, part_out, activation, sgd, weights)
    }

    /// Build from explicit weights (block-major `(parts, part_in + 1, part_out)`).
    pub fn from_parts(
        parts: usize,
        part_in: usize,
        part_out: usize,
        activation: Activation,
        sgd: MomentumSgd,
        weights: Vec<f64>,
    ) -> Result<Self> {
        if parts == 0 || part_in == 0 || part_out == 0 {
            return Err(Error::InvalidConfig(format!(
                "parallel layer dims must be > 0, got parts={parts} part_in={part_in} part_out={part_out}"
            )));
        }
        validate_common(activation, &sgd)?;
        validate_weights(&weights, parts * (part_in + 1) * part_out)?;

        Ok(Self {
            parts,
            part_in,
            part_out,
            activation,
            sgd,
            deltas: vec![0.0; weights.len()],
            weights,
            cache: Cache::new(parts * part_in, parts * part_out),
        })
    }

    #[inline]
    pub fn parts(&self) -> usize {
        self.parts
    }

    #[inline]
    pub fn part_in(&self) -> usize {
        self.part_in
    }

    #[inline]
    pub fn part_out(&self) -> usize {
        self.part_out
    }

    #[inline]
    fn block_len(&self) -> usize {
        (self.part_in + 1) * self.part_out
    }

    /// Weight of block `part` from input `row` (bias when `row == part_in`) to output `col`.
    pub fn weight(&self, part: usize, row: usize, col: usize) -> Option<f64> {
        if part >= self.parts || row > self.part_in || col >= self.part_out {
            return None;
        }
        Some(self.weights[part * self.block_len() + row * self.part_out + col])
    }
}

impl Layer {
    #[inline]
    pub fn in_dim(&self) -> usize {
        match self {
            Layer::FullyConnected(l) => l.in_dim,
            Layer::Parallel(l) => l.parts * l.part_in,
        }
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        match self {
            Layer::FullyConnected(l) => l.out_dim,
            Layer::Parallel(l) => l.parts * l.part_out,
        }
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        match self {
            Layer::FullyConnected(l) => l.activation,
            Layer::Parallel(l) => l.activation,
        }
    }

    #[inline]
    pub fn sgd(&self) -> MomentumSgd {
        match self {
            Layer::FullyConnected(l) => l.sgd,
            Layer::Parallel(l) => l.sgd,
        }
    }

    pub fn set_sgd(&mut self, sgd: MomentumSgd) {
        match self {
            Layer::FullyConnected(l) => l.sgd = sgd,
            Layer::Parallel(l) => l.sgd = sgd,
        }
    }

    /// All weights in storage order (row-major or block-major).
    #[inline]
    pub fn weights(&self) -> &[f64] {
        match self {
            Layer::FullyConnected(l) => &l.weights,
            Layer::Parallel(l) => &l.weights,
        }
    }

    fn cache(&self) -> &Cache {
        match self {
            Layer::FullyConnected(l) => &l.cache,
            Layer::Parallel(l) => &l.cache,
        }
    }

    /// Post-activation output of the most recent training forward pass.
    #[inline]
    pub fn output(&self) -> &[f64] {
        &self.cache().post
    }

    /// Error with respect to this layer's input, produced by the most recent `backward`.
    #[inline]
    pub fn input_error(&self) -> &[f64] {
        &self.cache().d_input
    }

    /// Training forward pass: caches input, pre- and post-activation values.
    ///
    /// Panics if `input.len() != self.in_dim()`.
    pub fn forward(&mut self, input: &[f64]) -> &[f64] {
        assert_eq!(
            input.len(),
            self.in_dim(),
            "input len {} does not match layer in_dim {}",
            input.len(),
            self.in_dim()
        );

        match self {
            Layer::FullyConnected(l) => {
                let c = &mut l.cache;
                c.input.copy_from_slice(input);
                affine(&l.weights, l.in_dim, l.out_dim, &c.input, &mut c.pre);
                for (y, &z) in c.post.iter_mut().zip(&c.pre) {
                    *y = l.activation.activate(z);
                }
                &l.cache.post
            }
            Layer::Parallel(l) => {
                let block_len = l.block_len();
                let c = &mut l.cache;
                c.input.copy_from_slice(input);
                for p in 0..l.parts {
                    affine(
                        &l.weights[p * block_len..(p + 1) * block_len],
                        l.part_in,
                        l.part_out,
                        &c.input[p * l.part_in..(p + 1) * l.part_in],
                        &mut c.pre[p * l.part_out..(p + 1) * l.part_out],
                    );
                }
                for (y, &z) in c.post.iter_mut().zip(&c.pre) {
                    *y = l.activation.activate(z);
                }
                &l.cache.post
            }
        }
    }

    /// Side-effect-free forward pass writing the activated output into `out`.
    ///
    /// Panics on shape mismatch.
    pub fn infer(&self, input: &[f64], out: &mut [f64]) {
        assert_eq!(input.len(), self.in_dim(), "input len does not match layer in_dim");
        assert_eq!(out.len(), self.out_dim(), "output len does not match layer out_dim");

        match self {
            Layer::FullyConnected(l) => {
                affine(&l.weights, l.in_dim, l.out_dim, input, out);
            }
            Layer::Parallel(l) => {
                let block_len = l.block_len();
                for p in 0..l.parts {
                    affine(
                        &l.weights[p * block_len..(p + 1) * block_len],
                        l.part_in,
                        l.part_out,
                        &input[p * l.part_in..(p + 1) * l.part_in],
                        &mut out[p * l.part_out..(p + 1) * l.part_out],
                    );
                }
            }
        }
        let act = self.activation();
        for y in out.iter_mut() {
            *y = act.activate(*y);
        }
    }

    /// Back-propagate `d_output` (error with respect to this layer's activated
    /// output), update the weights, and return the error with respect to the input.
    ///
    /// Must follow a `forward` call; the cached values of that pass are used.
    pub fn backward(&mut self, d_output: &[f64]) -> &[f64] {
        assert_eq!(
            d_output.len(),
            self.out_dim(),
            "d_output len {} does not match layer out_dim {}",
            d_output.len(),
            self.out_dim()
        );

        match self {
            Layer::FullyConnected(l) => {
                let c = &mut l.cache;
                to_pre_activation(l.activation, &c.pre, &c.post, d_output, &mut c.d_pre);
                dense_backward(
                    &mut l.weights,
                    &mut l.deltas,
                    l.in_dim,
                    l.out_dim,
                    &l.sgd,
                    &c.input,
                    &c.d_pre,
                    &mut c.d_input,
                );
                &l.cache.d_input
            }
            Layer::Parallel(l) => {
                let block_len = l.block_len();
                let c = &mut l.cache;
                to_pre_activation(l.activation, &c.pre, &c.post, d_output, &mut c.d_pre);
                for p in 0..l.parts {
                    let w = p * block_len..(p + 1) * block_len;
                    let i = p * l.part_in..(p + 1) * l.part_in;
                    let o = p * l.part_out..(p + 1) * l.part_out;
                    dense_backward(
                        &mut l.weights[w.clone()],
                        &mut l.deltas[w],
                        l.part_in,
                        l.part_out,
                        &l.sgd,
                        &c.input[i.clone()],
                        &c.d_pre[o],
                        &mut c.d_input[i],
                    );
                }
                &l.cache.d_input
            }
        }
    }

    /// Seed error for the final layer: `target - activated_output`.
    pub fn last_layer_error(&self, target: &[f64]) -> Vec<f64> {
        let out = self.output();
        assert_eq!(
            target.len(),
            out.len(),
            "target len {} does not match layer out_dim {}",
            target.len(),
            out.len()
        );
        target.iter().zip(out).map(|(t, y)| t - y).collect()
    }
}

/// `pre = W^T [input; 1]` for a row-major `(in_dim + 1, out_dim)` weight block.
#[inline]
fn affine(weights: &[f64], in_dim: usize, out_dim: usize, input: &[f64], pre: &mut [f64]) {
    debug_assert_eq!(weights.len(), (in_dim + 1) * out_dim);
    debug_assert_eq!(input.len(), in_dim);
    debug_assert_eq!(pre.len(), out_dim);

    let bias = in_dim * out_dim;
    for o in 0..out_dim {
        let mut z = weights[bias + o];
        for i in 0..in_dim {
            z = weights[i * out_dim + o].mul_add(input[i], z);
        }
        pre[o] = z;
    }
}

#[inline]
fn to_pre_activation(act: Activation, pre: &[f64], post: &[f64], d_out: &[f64], d_pre: &mut [f64]) {
    for o in 0..d_pre.len() {
        d_pre[o] = act.derive(pre[o], post[o]) * d_out[o];
    }
}

/// Propagate `d_pre` to `d_input` and apply the momentum update to every weight.
///
/// The propagated error reads each weight before that weight is updated.
#[allow(clippy::too_many_arguments)]
#[inline]
fn dense_backward(
    weights: &mut [f64],
    deltas: &mut [f64],
    in_dim: usize,
    out_dim: usize,
    sgd: &MomentumSgd,
    input: &[f64],
    d_pre: &[f64],
    d_input: &mut [f64],
) {
    debug_assert_eq!(weights.len(), (in_dim + 1) * out_dim);
    debug_assert_eq!(deltas.len(), weights.len());
    debug_assert_eq!(d_input.len(), in_dim);

    for i in 0..in_dim {
        let row = i * out_dim;
        let mut acc = 0.0;
        for o in 0..out_dim {
            acc = weights[row + o].mul_add(d_pre[o], acc);
            sgd.step(&mut weights[row + o], &mut deltas[row + o], d_pre[o], input[i]);
        }
        d_input[i] = acc;
    }

    let bias = in_dim * out_dim;
    for o in 0..out_dim {
        sgd.step(&mut weights[bias + o], &mut deltas[bias + o], d_pre[o], 1.0);
    }
}

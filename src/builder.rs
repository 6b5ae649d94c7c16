//! Network builder.
//!
//! `NetworkBuilder` is the recommended way to define a network. It makes the
//! topology explicit (layer kinds, widths and activations) and validates that
//! each layer fits the previous one before any weights are drawn.
//!
//! A typical multi-label network is a stack of fully-connected layers that
//! learns shared features, followed by parallel layers with one block per
//! label, ending in two units per label:
//!
//! ```rust
//! use cmale::{Activation, NetworkBuilder};
//!
//! # fn main() -> cmale::Result<()> {
//! // 4 features -> 12 hidden -> 3 labels x (4 -> 3 -> 2)
//! let net = NetworkBuilder::new(4)?
//!     .fully_connected(12, Activation::Sigmoid)?
//!     .parallel(3, 3, Activation::Sigmoid)?
//!     .parallel(3, 2, Activation::Sigmoid)?
//!     .build_with_seed(0)?;
//! assert_eq!(net.output_dim(), 6);
//! # Ok(())
//! # }
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::layer::{FullyConnected, Parallel};
use crate::{Activation, Error, Layer, MomentumSgd, Network, Result};

#[derive(Debug, Clone, Copy)]
enum LayerSpec {
    FullyConnected {
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
    },
    Parallel {
        parts: usize,
        part_in: usize,
        part_out: usize,
        activation: Activation,
    },
}

#[derive(Debug, Clone)]
/// Builder for a `Network`.
pub struct NetworkBuilder {
    /// Output width of the last added layer (the input width before any).
    width: usize,
    sgd: MomentumSgd,
    layers: Vec<LayerSpec>,
}

impl NetworkBuilder {
    /// Start building a network that accepts inputs of length `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            width: input_dim,
            sgd: MomentumSgd::default(),
            layers: Vec::new(),
        })
    }

    /// Multi-label topology: `hidden` fully-connected widths, then one parallel
    /// layer per entry of `part_widths`, each split into `num_labels` blocks.
    ///
    /// `activations` holds one activation per layer, fully-connected first.
    /// The last part width must be 2 (negative / positive unit per label).
    pub fn multi_label(
        input_dim: usize,
        num_labels: usize,
        hidden: &[usize],
        part_widths: &[usize],
        activations: &[Activation],
        sgd: MomentumSgd,
    ) -> Result<Self> {
        if num_labels == 0 {
            return Err(Error::InvalidConfig("num_labels must be > 0".to_owned()));
        }
        if part_widths.last() != Some(&2) {
            return Err(Error::InvalidConfig(format!(
                "the last parallel layer must emit 2 units per label, got part widths {part_widths:?}"
            )));
        }
        let num_layers = hidden.len() + part_widths.len();
        if activations.len() != num_layers {
            return Err(Error::InvalidConfig(format!(
                "activations length {} does not match layer count {num_layers}",
                activations.len()
            )));
        }

        let mut b = Self::new(input_dim)?.sgd(sgd);
        let (fc_acts, par_acts) = activations.split_at(hidden.len());
        for (&out_dim, &act) in hidden.iter().zip(fc_acts) {
            b = b.fully_connected(out_dim, act)?;
        }
        for (&part_out, &act) in part_widths.iter().zip(par_acts) {
            b = b.parallel(num_labels, part_out, act)?;
        }
        Ok(b)
    }

    /// Learning rate and momentum shared by all layers.
    pub fn sgd(mut self, sgd: MomentumSgd) -> Self {
        self.sgd = sgd;
        self
    }

    /// Add a dense layer with `out_dim` outputs.
    pub fn fully_connected(mut self, out_dim: usize, activation: Activation) -> Result<Self> {
        if out_dim == 0 {
            return Err(Error::InvalidConfig("layer out_dim must be > 0".to_owned()));
        }
        activation.validate()?;

        self.layers.push(LayerSpec::FullyConnected {
            in_dim: self.width,
            out_dim,
            activation,
        });
        self.width = out_dim;
        Ok(self)
    }

    /// Add a parallel layer splitting the current width into `parts` equal blocks,
    /// each producing `part_out` outputs.
    pub fn parallel(mut self, parts: usize, part_out: usize, activation: Activation) -> Result<Self> {
        if parts == 0 || part_out == 0 {
            return Err(Error::InvalidConfig(format!(
                "parallel layer needs parts > 0 and part_out > 0, got {parts} and {part_out}"
            )));
        }
        if self.width % parts != 0 {
            return Err(Error::InvalidConfig(format!(
                "width {} cannot be split into {parts} equal parts",
                self.width
            )));
        }
        activation.validate()?;

        self.layers.push(LayerSpec::Parallel {
            parts,
            part_in: self.width / parts,
            part_out,
            activation,
        });
        self.width = parts * part_out;
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig(
                "network must have at least one layer".to_owned(),
            ));
        }
        self.sgd.validate()?;

        let mut layers = Vec::with_capacity(self.layers.len());
        for entry in self.layers {
            let layer = match entry {
                LayerSpec::FullyConnected {
                    in_dim,
                    out_dim,
                    activation,
                } => Layer::FullyConnected(FullyConnected::new_with_rng(
                    in_dim, out_dim, activation, self.sgd, rng,
                )?),
                LayerSpec::Parallel {
                    parts,
                    part_in,
                    part_out,
                    activation,
                } => Layer::Parallel(Parallel::new_with_rng(
                    parts, part_in, part_out, activation, self.sgd, rng,
                )?),
            };
            layers.push(layer);
        }

        Network::from_layers(layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_label_builds_expected_shapes() {
        let acts = Activation::parse_kinds("ssss", 0.0).unwrap();
        let net = NetworkBuilder::multi_label(4, 3, &[8, 12], &[3, 2], &acts, MomentumSgd::default())
            .unwrap()
            .build_with_seed(1)
            .unwrap();

        assert_eq!(net.input_dim(), 4);
        assert_eq!(net.output_dim(), 6);
        assert_eq!(net.num_layers(), 4);
        match net.layer(2).unwrap() {
            Layer::Parallel(p) => {
                assert_eq!(p.parts(), 3);
                assert_eq!(p.part_in(), 4);
                assert_eq!(p.part_out(), 3);
            }
            Layer::FullyConnected(_) => panic!("expected a parallel layer"),
        }
    }

    #[test]
    fn multi_label_rejects_bad_topologies() {
        let acts = Activation::parse_kinds("sss", 0.0).unwrap();
        let sgd = MomentumSgd::default();
        // Last part width must be 2.
        assert!(NetworkBuilder::multi_label(4, 3, &[12], &[3, 3], &acts, sgd).is_err());
        // 10 hidden units cannot be split across 3 labels.
        assert!(NetworkBuilder::multi_label(4, 3, &[10], &[3, 2], &acts, sgd).is_err());
        // Activation count mismatch.
        assert!(NetworkBuilder::multi_label(4, 3, &[12], &[2], &acts, sgd).is_err());
    }

    #[test]
    fn first_layer_reads_the_builder_input_dim() {
        let net = NetworkBuilder::new(6)
            .unwrap()
            .parallel(3, 2, Activation::Sigmoid)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        assert_eq!(net.input_dim(), 6);
        assert_eq!(net.output_dim(), 6);
        match net.layer(0).unwrap() {
            Layer::Parallel(p) => assert_eq!(p.part_in(), 2),
            Layer::FullyConnected(_) => panic!("expected a parallel layer"),
        }
    }

    #[test]
    fn empty_builder_is_rejected() {
        assert!(NetworkBuilder::new(0).is_err());
        assert!(NetworkBuilder::new(2).unwrap().build_with_seed(0).is_err());
    }
}

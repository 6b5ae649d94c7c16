//! Network serialization (feature: `serde`).
//!
//! A versioned JSON snapshot of a trained `Network`: topology, activations,
//! optimizer settings and weights. Internal layer structs are not serialized
//! directly so the file format can stay stable.
//!
//! Loading validates dimensions, weight lengths, layer chaining and that all
//! weights are finite. Momentum state is not saved; a loaded network resumes
//! training with zero previous deltas.

use serde::{Deserialize, Serialize};

use std::path::Path;

use crate::layer::{FullyConnected, Parallel};
use crate::{Activation, Error, Layer, MomentumSgd, Network, Result};

pub const NETWORK_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNetwork {
    pub format_version: u32,
    pub layers: Vec<SerializedLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedLayer {
    FullyConnected {
        in_dim: usize,
        out_dim: usize,
        activation: SerializedActivation,
        learning_rate: f64,
        momentum: f64,
        /// Row-major `(in_dim + 1, out_dim)`, bias row last.
        weights: Vec<f64>,
    },
    Parallel {
        parts: usize,
        part_in: usize,
        part_out: usize,
        activation: SerializedActivation,
        learning_rate: f64,
        momentum: f64,
        /// Block-major `(parts, part_in + 1, part_out)`.
        weights: Vec<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedActivation {
    ArcTan,
    Elu { alpha: f64 },
    Identity,
    LeakyRelu { alpha: f64 },
    Relu,
    SoftSign,
    Sigmoid,
    Tanh,
    SoftPlus,
}

impl From<Activation> for SerializedActivation {
    fn from(value: Activation) -> Self {
        match value {
            Activation::ArcTan => Self::ArcTan,
            Activation::Elu { alpha } => Self::Elu { alpha },
            Activation::Identity => Self::Identity,
            Activation::LeakyReLU { alpha } => Self::LeakyRelu { alpha },
            Activation::ReLU => Self::Relu,
            Activation::SoftSign => Self::SoftSign,
            Activation::Sigmoid => Self::Sigmoid,
            Activation::Tanh => Self::Tanh,
            Activation::SoftPlus => Self::SoftPlus,
        }
    }
}

impl From<SerializedActivation> for Activation {
    fn from(value: SerializedActivation) -> Self {
        match value {
            SerializedActivation::ArcTan => Self::ArcTan,
            SerializedActivation::Elu { alpha } => Self::Elu { alpha },
            SerializedActivation::Identity => Self::Identity,
            SerializedActivation::LeakyRelu { alpha } => Self::LeakyReLU { alpha },
            SerializedActivation::Relu => Self::ReLU,
            SerializedActivation::SoftSign => Self::SoftSign,
            SerializedActivation::Sigmoid => Self::Sigmoid,
            SerializedActivation::Tanh => Self::Tanh,
            SerializedActivation::SoftPlus => Self::SoftPlus,
        }
    }
}

impl From<&Layer> for SerializedLayer {
    fn from(layer: &Layer) -> Self {
        let activation = SerializedActivation::from(layer.activation());
        let sgd = layer.sgd();
        let weights = layer.weights().to_vec();
        match layer {
            Layer::FullyConnected(_) => Self::FullyConnected {
                in_dim: layer.in_dim(),
                out_dim: layer.out_dim(),
                activation,
                learning_rate: sgd.learning_rate(),
                momentum: sgd.momentum(),
                weights,
            },
            Layer::Parallel(p) => Self::Parallel {
                parts: p.parts(),
                part_in: p.part_in(),
                part_out: p.part_out(),
                activation,
                learning_rate: sgd.learning_rate(),
                momentum: sgd.momentum(),
                weights,
            },
        }
    }
}

impl TryFrom<SerializedLayer> for Layer {
    type Error = Error;

    fn try_from(value: SerializedLayer) -> std::result::Result<Self, Self::Error> {
        let layer = match value {
            SerializedLayer::FullyConnected {
                in_dim,
                out_dim,
                activation,
                learning_rate,
                momentum,
                weights,
            } => Layer::FullyConnected(FullyConnected::from_parts(
                in_dim,
                out_dim,
                activation.into(),
                MomentumSgd::new(learning_rate, momentum)?,
                weights,
            )?),
            SerializedLayer::Parallel {
                parts,
                part_in,
                part_out,
                activation,
                learning_rate,
                momentum,
                weights,
            } => Layer::Parallel(Parallel::from_parts(
                parts,
                part_in,
                part_out,
                activation.into(),
                MomentumSgd::new(learning_rate, momentum)?,
                weights,
            )?),
        };
        Ok(layer)
    }
}

impl From<&Network> for SerializedNetwork {
    fn from(network: &Network) -> Self {
        Self {
            format_version: NETWORK_FORMAT_VERSION,
            layers: network.layers().iter().map(SerializedLayer::from).collect(),
        }
    }
}

impl TryFrom<SerializedNetwork> for Network {
    type Error = Error;

    fn try_from(value: SerializedNetwork) -> std::result::Result<Self, Self::Error> {
        if value.format_version != NETWORK_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported network format_version {}; expected {}",
                value.format_version, NETWORK_FORMAT_VERSION
            )));
        }

        let mut layers = Vec::with_capacity(value.layers.len());
        for (i, layer) in value.layers.into_iter().enumerate() {
            let l = Layer::try_from(layer)
                .map_err(|e| Error::InvalidData(format!("layer {i} invalid: {e}")))?;
            layers.push(l);
        }

        Network::from_layers(layers).map_err(|e| Error::InvalidData(e.to_string()))
    }
}

impl Network {
    /// Serialize the network to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&SerializedNetwork::from(self))
            .map_err(|e| Error::InvalidData(format!("failed to serialize network: {e}")))
    }

    /// Serialize the network to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&SerializedNetwork::from(self))
            .map_err(|e| Error::InvalidData(format!("failed to serialize network: {e}")))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedNetwork = serde_json::from_str(s)
            .map_err(|e| Error::InvalidData(format!("failed to parse network json: {e}")))?;
        ser.try_into()
    }

    /// Save the network to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, s)
            .map_err(|e| Error::InvalidData(format!("failed to write {}: {e}", p.display())))
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidData(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }
}

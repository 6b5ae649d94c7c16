use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    #[error("unsupported activation kind {0:?}")]
    UnknownActivation(char),
    #[error("cannot query an empty set of labels for instance {instance}")]
    EmptyQuery { instance: usize },
    #[error("label {label} of instance {instance} has already been queried")]
    AlreadyQueried { instance: usize, label: usize },
    #[error("index ({instance}, {label}) is out of bounds for {num_instances} x {num_labels}")]
    IndexOutOfBounds {
        instance: usize,
        label: usize,
        num_instances: usize,
        num_labels: usize,
    },
    #[error("label {label} of instance {instance} has not been predicted")]
    Unpredicted { instance: usize, label: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("Compute device initialisation failed: {0}")]
    DeviceInit(String),
    #[error("Noise volume generation failed: {0}")]
    Generation(String),
    #[error("Program `{program}` has no parameter named `{name}`")]
    MissingParameter { program: &'static str, name: String },
    #[error("Parameter `{name}` of program `{program}` expects a {expected} value")]
    ParameterType { program: &'static str, name: String, expected: &'static str },
    #[error("Dispatch error: {0}")]
    Dispatch(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] ron::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type CloudResult<T> = Result<T, CloudError>;

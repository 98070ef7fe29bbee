use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Expected a mapping at `{path}`")]
    NotAMapping { path: String },

    #[error("Environment variable {name} is not set")]
    MissingEnv { name: &'static str },
}

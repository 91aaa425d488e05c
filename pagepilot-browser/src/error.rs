use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Launch failed: {0}")]
    Launch(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Browser action failed: {0}")]
    Action(String),

    #[error("Invalid browser config: {0}")]
    Config(String),
}

impl BrowserError {
    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }
}

use std::error::Error;
use std::fmt;

/// Startup stage that failed. Any of these ends the process.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InitStage {
    Config,
    Display,
    Mode,
    GpuSurface,
    RenderContext,
    Producers,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InitStage::Config => "configuration",
            InitStage::Display => "display controller",
            InitStage::Mode => "display mode",
            InitStage::GpuSurface => "GPU surface",
            InitStage::RenderContext => "render context",
            InitStage::Producers => "render producers",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug)]
pub struct InitError {
    pub stage: InitStage,
    pub message: String,
}

impl InitError {
    pub fn new(stage: InitStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} initialization failed: {}", self.stage, self.message)
    }
}

impl Error for InitError {}

pub mod builder;
pub mod deployer;
pub mod docker;
pub mod engine;
pub mod error;
pub mod labels;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use builder::{BuildError, BuiltImage, ImageBuilder};
pub use deployer::{AppStatus, AppSummary, ContainerDeployer, DEFAULT_LOG_TAIL, DeploymentError};
pub use docker::DockerEngine;
pub use engine::{ContainerEngine, ContainerInfo, ContainerSpec};
pub use error::EngineError;
pub use labels::deployment_labels;

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod server;

// Re-export commonly used types for easier testing
pub use crate::client::UploadClient;
pub use crate::config::{AnalysisConfig, Config};
pub use crate::error::{AnalysisError, UploadError};
pub use crate::pipeline::{analyze_image, AnalysisResult};
pub use crate::report::{AnalysisReport, PieChart};
pub use crate::server::build_router;

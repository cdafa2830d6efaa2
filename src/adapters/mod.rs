// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod http_reqwest;
pub mod metadata_file;
pub mod metadata_http;
pub mod probe_ffprobe;
#[cfg(feature = "libav")]
pub mod probe_libav;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::FfmpegAdapter;
pub use http_reqwest::ReqwestStreamAdapter;
pub use metadata_file::ManifestDirAdapter;
pub use metadata_http::HttpMetadataAdapter;
pub use probe_ffprobe::FfprobeAdapter;
#[cfg(feature = "libav")]
pub use probe_libav::ProbeLibavAdapter;
pub use toml_config::{AppConfig, ProbeBackend, TomlConfigAdapter};
pub use tracing_log::{init_tracing, LogLevel};

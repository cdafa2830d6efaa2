use std::sync::Arc;

use tracing::{debug, info};

use crate::adapters::{
    AppConfig, FfmpegAdapter, FfprobeAdapter, HttpMetadataAdapter, ManifestDirAdapter,
    ProbeBackend, ReqwestStreamAdapter,
};
use crate::app::{
    clip_interactor::ClipInteractor, concat_interactor::ConcatInteractor,
    fetch_interactor::{FetchInteractor, FetchSettings},
    request_interactor::RequestInteractor,
};
use crate::domain::errors::DomainError;
use crate::domain::model::{Outcome, TaskSpec};
use crate::engine::{TaskContext, TaskExecutor};
use crate::ports::{MediaPort, MetadataPort, ProbePort, PromptPort, StreamPort};
use crate::probe::StreamProber;

pub trait AppContainer: Send + Sync {
    fn prober(&self) -> StreamProber;
    fn clip_interactor(&self) -> Arc<ClipInteractor>;
    fn concat_interactor(&self) -> Arc<ConcatInteractor>;
    /// `None` when no metadata source is configured
    fn fetch_interactor(&self) -> Option<Arc<FetchInteractor>>;
}

pub struct DefaultAppContainer {
    prober: StreamProber,
    clip_interactor: Arc<ClipInteractor>,
    concat_interactor: Arc<ConcatInteractor>,
    fetch_interactor: Option<Arc<FetchInteractor>>,
}

impl DefaultAppContainer {
    /// Wire the production adapters.
    ///
    /// Builds a blocking HTTP client, so it must run outside any async
    /// runtime.
    pub fn new(config: &AppConfig) -> Result<Self, DomainError> {
        let probe_port = probe_port(config)?;
        let media_port: Arc<dyn MediaPort> = Arc::new(FfmpegAdapter::new(&config.ffmpeg_path));

        let metadata_port: Option<Arc<dyn MetadataPort>> = match (&config.manifest_dir, &config.resolver_url) {
            (Some(dir), _) => {
                debug!(dir = %dir.display(), "metadata from manifest directory");
                Some(Arc::new(ManifestDirAdapter::new(dir)))
            }
            (None, Some(url)) => {
                debug!(%url, "metadata from resolver endpoint");
                Some(Arc::new(HttpMetadataAdapter::new(url, &config.user_agent)?))
            }
            (None, None) => None,
        };

        let fetch_interactor = match metadata_port {
            Some(metadata_port) => {
                let stream_port: Arc<dyn StreamPort> =
                    Arc::new(ReqwestStreamAdapter::new(&config.user_agent, &config.referer)?);
                let settings = FetchSettings {
                    downloads_dir: config.resolved_downloads_dir()?,
                    chunk_size: config.chunk_size,
                    mp3_bitrate_kbps: config.mp3_bitrate_kbps,
                };
                Some(Arc::new(FetchInteractor::new(
                    metadata_port,
                    stream_port,
                    Arc::clone(&media_port),
                    settings,
                )))
            }
            None => None,
        };

        Ok(Self::from_parts(
            probe_port,
            media_port,
            fetch_interactor,
            config.mp3_bitrate_kbps,
        ))
    }

    /// Wire arbitrary ports; tests use this with fakes.
    pub fn from_parts(
        probe_port: Arc<dyn ProbePort>,
        media_port: Arc<dyn MediaPort>,
        fetch_interactor: Option<Arc<FetchInteractor>>,
        mp3_bitrate_kbps: u32,
    ) -> Self {
        let prober = StreamProber::new(probe_port);
        let clip_interactor = Arc::new(ClipInteractor::new(
            prober.clone(),
            Arc::clone(&media_port),
            mp3_bitrate_kbps,
        ));
        let concat_interactor = Arc::new(ConcatInteractor::new(
            prober.clone(),
            media_port,
            mp3_bitrate_kbps,
        ));

        Self {
            prober,
            clip_interactor,
            concat_interactor,
            fetch_interactor,
        }
    }

    pub fn request_interactor(&self, prompt: Arc<dyn PromptPort>) -> RequestInteractor {
        RequestInteractor::new(self.prober.clone(), prompt)
    }
}

fn probe_port(config: &AppConfig) -> Result<Arc<dyn ProbePort>, DomainError> {
    match config.probe_backend {
        ProbeBackend::Ffprobe => Ok(Arc::new(FfprobeAdapter::new(&config.ffprobe_path))),
        #[cfg(feature = "libav")]
        ProbeBackend::Libav => Ok(Arc::new(crate::adapters::ProbeLibavAdapter::new()?)),
        #[cfg(not(feature = "libav"))]
        ProbeBackend::Libav => Err(DomainError::Config(
            "probe_backend = \"libav\" needs a build with the `libav` feature".to_string(),
        )),
    }
}

impl AppContainer for DefaultAppContainer {
    fn prober(&self) -> StreamProber {
        self.prober.clone()
    }

    fn clip_interactor(&self) -> Arc<ClipInteractor> {
        Arc::clone(&self.clip_interactor)
    }

    fn concat_interactor(&self) -> Arc<ConcatInteractor> {
        Arc::clone(&self.concat_interactor)
    }

    fn fetch_interactor(&self) -> Option<Arc<FetchInteractor>> {
        self.fetch_interactor.clone()
    }
}

impl TaskExecutor for DefaultAppContainer {
    fn execute(&self, spec: &TaskSpec, ctx: &TaskContext) -> Outcome {
        info!(task_id = %ctx.id(), kind = %spec.kind(), task = %spec.describe(), "task started");
        let result = match spec {
            TaskSpec::Fetch(request) => match &self.fetch_interactor {
                Some(fetch) => fetch.execute(request, ctx),
                None => Err(DomainError::Config(
                    "no metadata source configured; set resolver_url or manifest_dir".to_string(),
                )),
            },
            TaskSpec::Clip(request) => self.clip_interactor.execute(request, ctx),
            TaskSpec::Concat(request) => self.concat_interactor.execute(request, ctx),
        };
        Outcome::from_result(result)
    }
}

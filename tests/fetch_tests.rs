//! Fetch unit against a local HTTP server and fake metadata/media ports

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use streamcut::adapters::ReqwestStreamAdapter;
use streamcut::app::{FetchInteractor, FetchSettings};
use streamcut::domain::errors::*;
use streamcut::domain::model::*;
use streamcut::engine::*;
use streamcut::ports::*;

const LINK: &str = "https://www.bilibili.com/video/BV1xx411c7mD?p=1";

// Test utilities

#[derive(Clone)]
struct Route {
    status: u16,
    body: Vec<u8>,
    /// Content-Length to announce; `None` omits the header
    declared: Option<usize>,
}

impl Route {
    fn ok(body: Vec<u8>) -> Self {
        let declared = Some(body.len());
        Self {
            status: 200,
            body,
            declared,
        }
    }
}

/// Minimal HTTP/1.1 server answering each connection once, then closing.
fn serve(routes: HashMap<&'static str, Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) => break,
                    Ok(_) if header == "\r\n" => break,
                    Ok(_) => {}
                    Err(_) => break,
                }
            }

            let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();
            let route = routes.get(path.as_str()).cloned().unwrap_or(Route {
                status: 404,
                body: b"missing".to_vec(),
                declared: Some(7),
            });
            let mut head = format!("HTTP/1.1 {} X\r\nConnection: close\r\n", route.status);
            if let Some(len) = route.declared {
                head.push_str(&format!("Content-Length: {}\r\n", len));
            }
            head.push_str("\r\n");
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&route.body);
            let _ = stream.flush();
        }
    });
    base
}

struct FakeMetadata {
    manifest: VideoManifest,
}

#[async_trait]
impl MetadataPort for FakeMetadata {
    async fn resolve(&self, id: &MediaIdentifier) -> DomainResult<VideoManifest> {
        assert_eq!(id.as_str(), "BV1xx411c7mD");
        Ok(self.manifest.clone())
    }
}

/// Concatenates its inputs into the output, or fails on demand
#[derive(Default)]
struct FakeMedia {
    fail: bool,
    jobs: Mutex<Vec<RenderJob>>,
}

impl MediaPort for FakeMedia {
    fn render(&self, job: &RenderJob, _ctx: &TaskContext) -> DomainResult<()> {
        self.jobs.lock().push(job.clone());
        if self.fail {
            return Err(DomainError::Media("Invalid data found when processing input".into()));
        }
        let mut joined = Vec::new();
        for input in &job.inputs {
            joined.extend(std::fs::read(&input.path).unwrap());
        }
        std::fs::write(&job.output, joined).unwrap();
        Ok(())
    }
}

struct Harness {
    dir: TempDir,
    media: Arc<FakeMedia>,
    fetch: FetchInteractor,
}

fn harness(base: &str, audio: &[&str], video: &[&str], fail_media: bool) -> Harness {
    let dir = TempDir::new().unwrap();
    let manifest = VideoManifest {
        title: "Demo: part/1".to_string(),
        content_id: "4242".to_string(),
        audio_urls: audio.iter().map(|p| format!("{}{}", base, p)).collect(),
        video_urls: video.iter().map(|p| format!("{}{}", base, p)).collect(),
    };
    let media = Arc::new(FakeMedia {
        fail: fail_media,
        ..Default::default()
    });
    let fetch = FetchInteractor::new(
        Arc::new(FakeMetadata { manifest }),
        Arc::new(ReqwestStreamAdapter::new("streamcut-test", "https://www.bilibili.com").unwrap()),
        media.clone(),
        FetchSettings {
            downloads_dir: dir.path().join("downloads"),
            chunk_size: 1024,
            mp3_bitrate_kbps: 192,
        },
    );
    Harness { dir, media, fetch }
}

fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn drain(rx: &mut EventReceiver) -> Vec<EventPayload> {
    let mut payloads = Vec::new();
    while let Ok(event) = rx.try_recv() {
        payloads.push(event.payload);
    }
    payloads
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

// Tests

#[test]
fn video_fetch_reports_monotonic_progress_ending_at_100() {
    let payload = body(10_000);
    let base = serve(HashMap::from([("/video.m4s", Route::ok(payload.clone()))]));
    let h = harness(&base, &[], &["/video.m4s"], false);
    let (ctx, mut rx) = TaskContext::standalone(TaskKind::Fetch);

    let request = FetchRequest {
        url: LINK.to_string(),
        mode: FetchMode::Mp4,
    };
    let output = h.fetch.execute(&request, &ctx).unwrap();

    assert_eq!(output, h.dir.path().join("downloads").join("Demo_ part_1.mp4"));
    assert_eq!(std::fs::read(&output).unwrap(), payload);

    let progress: Vec<u8> = drain(&mut rx)
        .into_iter()
        .filter_map(|p| match p {
            EventPayload::Progress(v) => Some(v),
            _ => None,
        })
        .collect();
    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|w| w[0] < w[1]), "{:?}", progress);
    assert_eq!(progress.last(), Some(&100));
    assert_eq!(progress.iter().filter(|p| **p == 100).count(), 1);
    assert!(h.media.jobs.lock().is_empty());
}

#[test]
fn short_body_fails_and_leaves_nothing() {
    let base = serve(HashMap::from([(
        "/video.m4s",
        Route {
            status: 200,
            body: body(4_000),
            declared: Some(10_000),
        },
    )]));
    let h = harness(&base, &[], &["/video.m4s"], false);
    let (ctx, mut rx) = TaskContext::standalone(TaskKind::Fetch);

    let request = FetchRequest {
        url: LINK.to_string(),
        mode: FetchMode::Mp4,
    };
    let err = h.fetch.execute(&request, &ctx).unwrap_err();

    assert!(matches!(err, DomainError::Network(_)), "{:?}", err);
    assert!(files_in(&h.dir.path().join("downloads")).is_empty());
    assert!(!drain(&mut rx).contains(&EventPayload::Progress(100)));
}

#[test]
fn missing_stream_is_a_network_error() {
    let base = serve(HashMap::new());
    let h = harness(&base, &["/gone.m4s"], &[], false);
    let (ctx, _rx) = TaskContext::standalone(TaskKind::Fetch);

    let request = FetchRequest {
        url: LINK.to_string(),
        mode: FetchMode::Mp4Audio,
    };
    let err = h.fetch.execute(&request, &ctx).unwrap_err();
    assert!(matches!(err, DomainError::Network(msg) if msg.contains("404")));
    assert!(files_in(&h.dir.path().join("downloads")).is_empty());
}

#[test]
fn malformed_link_fails_before_any_request() {
    let h = harness("http://127.0.0.1:9", &["/a"], &["/v"], false);
    let (ctx, mut rx) = TaskContext::standalone(TaskKind::Fetch);

    let request = FetchRequest {
        url: "https://example.com/watch?v=nothing".to_string(),
        mode: FetchMode::Full,
    };
    let err = h.fetch.execute(&request, &ctx).unwrap_err();
    assert!(matches!(err, DomainError::InvalidIdentifier(_)));
    assert!(!h.dir.path().join("downloads").exists());
    assert!(drain(&mut rx).contains(&EventPayload::Status("failed".to_string())));
}

#[test]
fn mp3_fetch_converts_and_removes_the_intermediate() {
    let base = serve(HashMap::from([("/audio.m4s", Route::ok(body(3_000)))]));
    let h = harness(&base, &["/audio.m4s"], &[], false);
    let (ctx, mut rx) = TaskContext::standalone(TaskKind::Fetch);

    let request = FetchRequest {
        url: LINK.to_string(),
        mode: FetchMode::Mp3,
    };
    let output = h.fetch.execute(&request, &ctx).unwrap();
    assert_eq!(output.file_name().unwrap(), "Demo_ part_1.mp3");
    assert_eq!(files_in(&h.dir.path().join("downloads")), vec!["Demo_ part_1.mp3"]);

    let jobs = h.media.jobs.lock();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].layout, RenderLayout::Single);
    assert_eq!(jobs[0].video, VideoPlan::Drop);
    assert_eq!(jobs[0].audio, AudioPlan::Mp3 { bitrate_kbps: 192 });
    assert!(jobs[0].inputs[0]
        .path
        .ends_with("temp_audio_BV1xx411c7mD_4242.m4a"));

    let statuses: Vec<String> = drain(&mut rx)
        .into_iter()
        .filter_map(|p| match p {
            EventPayload::Status(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec!["created", "resolving", "streaming 1/1", "converting", "done"]
    );
}

#[test]
fn full_fetch_merges_video_then_audio() {
    let base = serve(HashMap::from([
        ("/video.m4s", Route::ok(b"VIDEO".to_vec())),
        ("/audio.m4s", Route::ok(b"AUDIO".to_vec())),
    ]));
    let h = harness(&base, &["/audio.m4s"], &["/video.m4s"], false);
    let (ctx, _rx) = TaskContext::standalone(TaskKind::Fetch);

    let request = FetchRequest {
        url: LINK.to_string(),
        mode: FetchMode::Full,
    };
    let output = h.fetch.execute(&request, &ctx).unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), b"VIDEOAUDIO");
    assert_eq!(files_in(&h.dir.path().join("downloads")), vec!["Demo_ part_1.mp4"]);
    let jobs = h.media.jobs.lock();
    assert_eq!(jobs[0].layout, RenderLayout::Merge);
    assert_eq!((jobs[0].video, jobs[0].audio), (VideoPlan::Copy, AudioPlan::Copy));
    assert!(ctx.owned_paths().is_empty());
}

#[test]
fn failed_merge_keeps_intermediates() {
    let base = serve(HashMap::from([
        ("/video.m4s", Route::ok(b"VIDEO".to_vec())),
        ("/audio.m4s", Route::ok(b"AUDIO".to_vec())),
    ]));
    let h = harness(&base, &["/audio.m4s"], &["/video.m4s"], true);
    let (ctx, _rx) = TaskContext::standalone(TaskKind::Fetch);

    let request = FetchRequest {
        url: LINK.to_string(),
        mode: FetchMode::Full,
    };
    let err = h.fetch.execute(&request, &ctx).unwrap_err();

    assert!(matches!(err, DomainError::MergeFailed(_)));
    assert_eq!(
        Outcome::Failed(err).message(TaskKind::Fetch).unwrap(),
        "Merge failed: Invalid data found when processing input"
    );
    assert_eq!(
        files_in(&h.dir.path().join("downloads")),
        vec![
            "temp_audio_BV1xx411c7mD_4242.m4a".to_string(),
            "temp_video_BV1xx411c7mD_4242.mp4".to_string(),
        ]
    );
    assert!(ctx.owned_paths().is_empty());
}

#[test]
fn cancelled_fetch_is_aborted_and_cleaned() {
    let base = serve(HashMap::from([("/video.m4s", Route::ok(body(50_000)))]));
    let h = harness(&base, &[], &["/video.m4s"], false);
    let (ctx, _rx) = TaskContext::standalone(TaskKind::Fetch);
    ctx.force_close();

    let request = FetchRequest {
        url: LINK.to_string(),
        mode: FetchMode::Mp4,
    };
    let err = h.fetch.execute(&request, &ctx).unwrap_err();
    assert!(err.is_aborted());
    assert!(files_in(&h.dir.path().join("downloads")).is_empty());
}

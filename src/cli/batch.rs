//! Batch job files
//!
//! ```toml
//! max_parallel = 2
//!
//! [[jobs]]
//! kind = "fetch"
//! url = "https://www.bilibili.com/video/BV1xx411c7mD"
//! mode = "mp3"
//!
//! [[jobs]]
//! kind = "clip"
//! input = "talk.mp4"
//! start = "1:00"
//! end = "1:30"
//! format = "with-audio"
//! ```
//!
//! YAML files use the same shape.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::args::{ClipFormatArg, ConcatModeArg, FetchModeArg};
use crate::domain::errors::*;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchFile {
    pub max_parallel: Option<usize>,
    #[serde(default)]
    pub jobs: Vec<BatchJob>,
}

fn default_fetch_mode() -> FetchModeArg {
    FetchModeArg::Full
}

fn default_start() -> String {
    "0".to_string()
}

fn default_concat_mode() -> ConcatModeArg {
    ConcatModeArg::Video
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BatchJob {
    Fetch {
        url: String,
        #[serde(default = "default_fetch_mode")]
        mode: FetchModeArg,
    },
    Clip {
        input: PathBuf,
        #[serde(default = "default_start")]
        start: String,
        end: Option<String>,
        #[serde(default)]
        audio: bool,
        format: Option<ClipFormatArg>,
    },
    Concat {
        first: PathBuf,
        #[serde(default = "default_start")]
        first_start: String,
        first_end: String,
        second: PathBuf,
        #[serde(default = "default_start")]
        second_start: String,
        second_end: String,
        #[serde(default = "default_concat_mode")]
        mode: ConcatModeArg,
    },
}

impl BatchFile {
    pub fn load(path: &Path) -> DomainResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DomainError::io(path.display(), e))?;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let parsed = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            _ => Self::from_toml(&content),
        };
        let mut file = parsed.map_err(|e| match e {
            DomainError::BadArgs(msg) => DomainError::BadArgs(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        file.rebase(path.parent().unwrap_or_else(|| Path::new("")));
        Ok(file)
    }

    pub fn from_toml(content: &str) -> DomainResult<Self> {
        toml::from_str(content).map_err(|e| DomainError::BadArgs(format!("invalid job file: {}", e)))
    }

    pub fn from_yaml(content: &str) -> DomainResult<Self> {
        serde_yaml::from_str(content).map_err(|e| DomainError::BadArgs(format!("invalid job file: {}", e)))
    }

    /// Relative inputs are taken relative to the job file.
    fn rebase(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for job in &mut self.jobs {
            match job {
                BatchJob::Fetch { .. } => {}
                BatchJob::Clip { input, .. } => fix(input),
                BatchJob::Concat { first, second, .. } => {
                    fix(first);
                    fix(second);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn toml_jobs_with_defaults() {
        let file = BatchFile::from_toml(
            r#"
            max_parallel = 3

            [[jobs]]
            kind = "fetch"
            url = "https://host/video/BV1xx411c7mD"

            [[jobs]]
            kind = "concat"
            first = "a.mp4"
            first_end = "5"
            second = "b.mp4"
            second_end = "0:05"
            mode = "audio-mp3"
            "#,
        )
        .unwrap();

        assert_eq!(file.max_parallel, Some(3));
        assert_eq!(
            file.jobs[0],
            BatchJob::Fetch {
                url: "https://host/video/BV1xx411c7mD".into(),
                mode: FetchModeArg::Full
            }
        );
        let BatchJob::Concat { first_start, mode, .. } = &file.jobs[1] else {
            panic!("expected concat");
        };
        assert_eq!(first_start, "0");
        assert_eq!(*mode, ConcatModeArg::AudioMp3);
    }

    #[test]
    fn yaml_jobs_parse() {
        let file = BatchFile::from_yaml(
            "jobs:\n  - kind: clip\n    input: talk.mp4\n    end: '30'\n    format: mp4-audio\n",
        )
        .unwrap();
        assert_eq!(file.max_parallel, None);
        assert!(matches!(
            &file.jobs[0],
            BatchJob::Clip { format: Some(ClipFormatArg::Mp4Audio), audio: false, .. }
        ));
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(BatchFile::from_toml("[[jobs]]\nkind = \"upload\"\n").is_err());
    }

    #[test]
    fn relative_inputs_follow_the_job_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jobs.toml");
        std::fs::write(&path, "[[jobs]]\nkind = \"clip\"\ninput = \"talk.mp4\"\n").unwrap();

        let file = BatchFile::load(&path).unwrap();
        let BatchJob::Clip { input, .. } = &file.jobs[0] else {
            panic!("expected clip");
        };
        assert_eq!(input, &dir.path().join("talk.mp4"));
    }
}

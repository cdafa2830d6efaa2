// Unit tests for domain models

#[cfg(test)]
mod tests {
    use crate::domain::model::*;
    use std::path::PathBuf;

    #[test]
    fn test_identifier_from_full_link() {
        let id = MediaIdentifier::from_url("https://www.bilibili.com/video/BV1xx411c7mD?p=2").unwrap();
        assert_eq!(id.as_str(), "BV1xx411c7mD");
    }

    #[test]
    fn test_identifier_takes_first_occurrence() {
        let id = MediaIdentifier::from_url("BVabcdefghij/BVzzzzzzzzzz").unwrap();
        assert_eq!(id.to_string(), "BVabcdefghij");
    }

    #[test]
    fn test_identifier_missing_marker() {
        let err = MediaIdentifier::from_url("https://example.com/watch?v=123").unwrap_err();
        assert!(matches!(err, DomainError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_identifier_too_short_or_malformed() {
        assert!(MediaIdentifier::from_url("https://x/BV12345").is_err());
        assert!(MediaIdentifier::from_url("https://x/BV12345/78901").is_err());
    }

    #[test]
    fn test_time_range_rejects_empty_and_inverted() {
        assert!(TimeRange::new(5, 5).is_err());
        assert!(TimeRange::new(10, 5).is_err());
        let range = TimeRange::new(5, 10).unwrap();
        assert_eq!(range.length(), 5);
    }

    #[test]
    fn test_time_range_label() {
        let range = TimeRange::new(61, 3723).unwrap();
        assert_eq!(range.label(), "00-01-01_01-02-03");
        assert_eq!(range.to_string(), "00:01:01-01:02:03");
    }

    #[test]
    fn test_time_range_within_duration() {
        let range = TimeRange::new(0, 30).unwrap();
        assert!(range.ensure_within(30).is_ok());
        assert!(matches!(
            range.ensure_within(29),
            Err(DomainError::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn test_format_dashed_pads_hours() {
        assert_eq!(format_dashed(0), "00-00-00");
        assert_eq!(format_dashed(36_000), "10-00-00");
    }

    #[test]
    fn test_outcome_messages() {
        let done = Outcome::Completed(PathBuf::from("out.mp4"));
        assert_eq!(
            done.message(TaskKind::Fetch).unwrap(),
            "Download complete: out.mp4"
        );

        let merge = Outcome::Failed(DomainError::MergeFailed("codec error".into()));
        assert_eq!(merge.message(TaskKind::Fetch).unwrap(), "Merge failed: codec error");

        let missing = Outcome::Failed(DomainError::MissingTrack("source has no audio track".into()));
        assert_eq!(
            missing.message(TaskKind::Clip).unwrap(),
            "Clip failed: source has no audio track"
        );

        assert!(Outcome::Aborted.message(TaskKind::Concat).is_none());
    }

    #[test]
    fn test_outcome_from_aborted_result() {
        assert_eq!(Outcome::from_result(Err(DomainError::Aborted)), Outcome::Aborted);
    }

    #[test]
    fn test_fetch_mode_track_needs() {
        assert!(FetchMode::Mp3.needs_audio() && !FetchMode::Mp3.needs_video());
        assert!(!FetchMode::Mp4.needs_audio() && FetchMode::Mp4.needs_video());
        assert!(FetchMode::Full.needs_audio() && FetchMode::Full.needs_video());
    }

    #[test]
    fn test_manifest_first_tracks() {
        let manifest = VideoManifest {
            title: "t".into(),
            content_id: "1".into(),
            audio_urls: vec!["http://a".into()],
            video_urls: vec![],
        };
        assert_eq!(manifest.first_audio().unwrap(), "http://a");
        assert!(matches!(manifest.first_video(), Err(DomainError::Metadata(_))));
    }

    #[test]
    fn test_descriptor_dimensions_require_both() {
        let desc = StreamDescriptor {
            has_video: true,
            has_audio: false,
            duration_seconds: 3,
            width: Some(320),
            height: None,
        };
        assert_eq!(desc.dimensions(), None);
    }
}

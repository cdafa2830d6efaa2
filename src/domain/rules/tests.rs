// Unit tests for business rules

#[cfg(test)]
mod tests {
    use crate::domain::rules::*;
    use std::path::{Path, PathBuf};

    fn descriptor(has_video: bool, has_audio: bool) -> StreamDescriptor {
        StreamDescriptor {
            has_video,
            has_audio,
            duration_seconds: 60,
            width: if has_video { Some(320) } else { None },
            height: if has_video { Some(240) } else { None },
        }
    }

    #[test]
    fn test_audio_clip_without_audio_fails() {
        let err = ClipPlanner::plan(
            Path::new("silent.mp4"),
            &descriptor(true, false),
            ClipTarget::Audio(AudioContainer::Mp3),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::MissingTrack(_)));
    }

    #[test]
    fn test_video_clip_of_mp4_takes_video_route() {
        let route = ClipPlanner::plan(
            Path::new("movie.mp4"),
            &descriptor(true, true),
            ClipTarget::Video { strip_audio: true },
        )
        .unwrap();
        assert_eq!(route, ClipRoute::Video { strip_audio: true });
    }

    #[test]
    fn test_video_clip_strips_audio_when_source_has_none() {
        let route = ClipPlanner::plan(
            Path::new("movie.MP4"),
            &descriptor(true, false),
            ClipTarget::Video { strip_audio: false },
        )
        .unwrap();
        assert_eq!(route, ClipRoute::Video { strip_audio: true });
    }

    #[test]
    fn test_video_clip_of_mp3_falls_back_to_audio() {
        let route = ClipPlanner::plan(
            Path::new("song.mp3"),
            &descriptor(false, true),
            ClipTarget::Video { strip_audio: false },
        )
        .unwrap();
        assert_eq!(route, ClipRoute::Audio(AudioContainer::Mp3));
    }

    #[test]
    fn test_audio_clip_keeps_chosen_container() {
        let route = ClipPlanner::plan(
            Path::new("movie.mp4"),
            &descriptor(true, true),
            ClipTarget::Audio(AudioContainer::Mp4Audio),
        )
        .unwrap();
        assert_eq!(route, ClipRoute::Audio(AudioContainer::Mp4Audio));
        assert_eq!(route.extension(), "mp4");
    }

    #[test]
    fn test_question_for_audio_clip_of_mp4() {
        let q = FormatPolicy::clip_question(Path::new("a.mp4"), &descriptor(true, true), ClipIntent::Audio).unwrap();
        assert_eq!(q, Some(FormatQuestion::AudioContainer));
    }

    #[test]
    fn test_no_question_for_mp3_source() {
        let q = FormatPolicy::clip_question(Path::new("a.mp3"), &descriptor(false, true), ClipIntent::Audio).unwrap();
        assert_eq!(q, None);
    }

    #[test]
    fn test_question_for_video_clip_needs_both_tracks() {
        let both = FormatPolicy::clip_question(Path::new("a.mp4"), &descriptor(true, true), ClipIntent::Video).unwrap();
        assert_eq!(both, Some(FormatQuestion::KeepAudio));

        let video_only = FormatPolicy::clip_question(Path::new("a.mp4"), &descriptor(true, false), ClipIntent::Video).unwrap();
        assert_eq!(video_only, None);
    }

    #[test]
    fn test_audio_clip_of_silent_mp4_rejected_before_question() {
        let result = FormatPolicy::clip_question(Path::new("a.mp4"), &descriptor(true, false), ClipIntent::Audio);
        assert!(matches!(result, Err(DomainError::MissingTrack(_))));
    }

    #[test]
    fn test_clip_target_from_answers() {
        let d = descriptor(true, true);
        assert_eq!(
            FormatPolicy::clip_target(ClipIntent::Audio, &d, Some(FormatAnswer::Mp4Audio)),
            ClipTarget::Audio(AudioContainer::Mp4Audio)
        );
        assert_eq!(
            FormatPolicy::clip_target(ClipIntent::Video, &d, Some(FormatAnswer::VideoOnly)),
            ClipTarget::Video { strip_audio: true }
        );
        assert_eq!(
            FormatPolicy::clip_target(ClipIntent::Audio, &d, None),
            ClipTarget::Audio(AudioContainer::Mp3)
        );
    }

    #[test]
    fn test_question_accepts_only_its_options() {
        assert!(FormatQuestion::AudioContainer.accepts(FormatAnswer::Mp3));
        assert!(!FormatQuestion::AudioContainer.accepts(FormatAnswer::VideoOnly));
    }

    #[test]
    fn test_only_audio_concat_asks_for_container() {
        assert_eq!(
            FormatPolicy::concat_question(ConcatIntent::Audio),
            Some(FormatQuestion::AudioContainer)
        );
        assert_eq!(FormatPolicy::concat_question(ConcatIntent::Video), None);
        assert_eq!(FormatPolicy::concat_question(ConcatIntent::VideoOnly), None);

        assert_eq!(
            FormatPolicy::concat_mode(ConcatIntent::Audio, Some(FormatAnswer::Mp4Audio)),
            ConcatMode::Audio(AudioContainer::Mp4Audio)
        );
        assert_eq!(FormatPolicy::concat_mode(ConcatIntent::VideoOnly, None), ConcatMode::VideoOnly);
    }

    #[test]
    fn test_concat_precondition_per_mode() {
        let video = descriptor(true, true);
        let audio = descriptor(false, true);

        assert!(ConcatPolicy::check(ConcatMode::Video, &video, &video).is_ok());
        assert!(ConcatPolicy::check(ConcatMode::VideoOnly, &video, &audio).is_err());
        assert!(ConcatPolicy::check(ConcatMode::Audio(AudioContainer::Mp3), &video, &audio).is_ok());
        assert!(ConcatPolicy::check(
            ConcatMode::Audio(AudioContainer::Mp4Audio),
            &descriptor(true, false),
            &audio
        )
        .is_err());
    }

    #[test]
    fn test_fetch_output_names() {
        assert_eq!(OutputNaming::fetch_output("Song", FetchMode::Mp3), "Song.mp3");
        assert_eq!(OutputNaming::fetch_output("Song", FetchMode::Mp4Audio), "Song_audio.mp4");
        assert_eq!(OutputNaming::fetch_output("Song", FetchMode::Full), "Song.mp4");
    }

    #[test]
    fn test_temp_names_are_track_specific() {
        let id = MediaIdentifier::from_url("BV1xx411c7mD").unwrap();
        assert_eq!(
            OutputNaming::temp_track(TrackFile::Audio, &id, "42"),
            "temp_audio_BV1xx411c7mD_42.m4a"
        );
        assert_eq!(
            OutputNaming::temp_track(TrackFile::Video, &id, "42"),
            "temp_video_BV1xx411c7mD_42.mp4"
        );
    }

    #[test]
    fn test_clip_output_beside_source() {
        let range = TimeRange::new(5, 65).unwrap();
        let out = OutputNaming::clip_output(Path::new("/media/talk.mp4"), &range, "mp3");
        assert_eq!(out, PathBuf::from("/media/talk_clip_00-00-05_00-01-05.mp3"));
    }

    #[test]
    fn test_concat_output_uses_first_start_and_second_end() {
        let r1 = TimeRange::new(3, 10).unwrap();
        let r2 = TimeRange::new(0, 7).unwrap();
        let out = OutputNaming::concat_output(Path::new("/m/a.mp4"), &r1, &r2, ConcatMode::VideoOnly);
        assert_eq!(out, PathBuf::from("/m/concat_00-00-03_00-00-07.mp4"));
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("a/b:c?"), "a_b_c_");
        assert_eq!(sanitize_title("  ...  "), "untitled");
        assert_eq!(sanitize_title("Live. "), "Live");
    }
}

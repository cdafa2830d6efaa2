//! Command-line construction for `ffmpeg`

use crate::domain::errors::*;
use crate::ports::*;

/// Sample format every concatenated audio input is normalized to
const CONCAT_AUDIO_FORMAT: &str = "aformat=sample_rates=44100:channel_layouts=stereo";

/// Silence matching `CONCAT_AUDIO_FORMAT`, standing in for a missing track
const CONCAT_SILENCE: &str = "anullsrc=r=44100:cl=stereo";

/// Build the full argument list for a render job.
pub fn build_args(job: &RenderJob) -> DomainResult<Vec<String>> {
    validate(job)?;

    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-y", "-nostats", "-progress", "pipe:1"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for input in &job.inputs {
        if let Some(range) = input.range {
            args.push("-ss".into());
            args.push(range.start().to_string());
            args.push("-t".into());
            args.push(range.length().to_string());
        }
        args.push("-i".into());
        args.push(input.path.to_string_lossy().into_owned());
    }

    match job.layout {
        RenderLayout::Single => {
            if job.video != VideoPlan::Drop {
                push_all(&mut args, &["-map", "0:v:0"]);
            }
            if job.audio != AudioPlan::Drop {
                push_all(&mut args, &["-map", "0:a:0"]);
            }
        }
        RenderLayout::Merge => {
            push_all(&mut args, &["-map", "0:v:0", "-map", "1:a:0"]);
        }
        RenderLayout::Concat => {
            args.push("-filter_complex".into());
            args.push(concat_filter(job));
            if job.video != VideoPlan::Drop {
                push_all(&mut args, &["-map", "[v]"]);
            }
            if job.audio != AudioPlan::Drop {
                push_all(&mut args, &["-map", "[a]"]);
            }
        }
    }

    match job.video {
        VideoPlan::Drop => args.push("-vn".into()),
        VideoPlan::Copy => push_all(&mut args, &["-c:v", "copy"]),
        VideoPlan::H264 => push_all(&mut args, &["-c:v", "libx264", "-pix_fmt", "yuv420p"]),
    }

    match job.audio {
        AudioPlan::Drop => args.push("-an".into()),
        AudioPlan::Copy => push_all(&mut args, &["-c:a", "copy"]),
        AudioPlan::Aac => push_all(&mut args, &["-c:a", "aac"]),
        AudioPlan::Mp3 { bitrate_kbps } => {
            push_all(&mut args, &["-c:a", "libmp3lame", "-b:a"]);
            args.push(format!("{}k", bitrate_kbps));
        }
    }

    if is_mp4_output(job) {
        push_all(&mut args, &["-movflags", "+faststart"]);
    }

    args.push(job.output.to_string_lossy().into_owned());
    Ok(args)
}

fn push_all(args: &mut Vec<String>, items: &[&str]) {
    args.extend(items.iter().map(|s| s.to_string()));
}

fn validate(job: &RenderJob) -> DomainResult<()> {
    let expected = match job.layout {
        RenderLayout::Single => job.inputs.len() == 1,
        RenderLayout::Merge => job.inputs.len() == 2,
        RenderLayout::Concat => job.inputs.len() >= 2,
    };
    if !expected {
        return Err(DomainError::BadArgs(format!(
            "{:?} layout cannot take {} input(s)",
            job.layout,
            job.inputs.len()
        )));
    }
    if job.video == VideoPlan::Drop && job.audio == AudioPlan::Drop {
        return Err(DomainError::BadArgs("render job keeps no track".to_string()));
    }
    if job.layout == RenderLayout::Merge && (job.video == VideoPlan::Drop || job.audio == AudioPlan::Drop) {
        return Err(DomainError::BadArgs("merge needs both a video and an audio track".to_string()));
    }
    if job.layout == RenderLayout::Concat && (job.video == VideoPlan::Copy || job.audio == AudioPlan::Copy) {
        return Err(DomainError::BadArgs("concatenation re-encodes every kept track".to_string()));
    }
    if job.layout == RenderLayout::Concat && job.audio != AudioPlan::Drop {
        if job.inputs.iter().all(|i| !i.has_audio) {
            return Err(DomainError::BadArgs("no concat input has an audio track".to_string()));
        }
        if let Some(input) = job.inputs.iter().find(|i| !i.has_audio && i.range.is_none()) {
            return Err(DomainError::BadArgs(format!(
                "{} has no audio track and no range to fill with silence",
                input.path.display()
            )));
        }
    }
    Ok(())
}

/// Filter graph joining every input in order.
///
/// Video inputs are fitted to the canvas (letterboxed) so frames of
/// different sizes can be joined. An input without sound contributes
/// silence for the length of its range.
fn concat_filter(job: &RenderJob) -> String {
    let keep_video = job.video != VideoPlan::Drop;
    let keep_audio = job.audio != AudioPlan::Drop;
    let mut graph = Vec::new();
    let mut chain = String::new();

    for index in 0..job.inputs.len() {
        if keep_video {
            let fit = match job.canvas {
                Some((w, h)) => format!(
                    "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,",
                    w = w,
                    h = h
                ),
                None => String::new(),
            };
            graph.push(format!("[{}:v:0]{}setsar=1,format=yuv420p[v{}]", index, fit, index));
            chain.push_str(&format!("[v{}]", index));
        }
        if keep_audio {
            let input = &job.inputs[index];
            match input.range {
                Some(range) if !input.has_audio => graph.push(format!(
                    "{},atrim=duration={}[a{}]",
                    CONCAT_SILENCE,
                    range.length(),
                    index
                )),
                _ => graph.push(format!("[{}:a:0]{}[a{}]", index, CONCAT_AUDIO_FORMAT, index)),
            }
            chain.push_str(&format!("[a{}]", index));
        }
    }

    let mut outputs = String::new();
    if keep_video {
        outputs.push_str("[v]");
    }
    if keep_audio {
        outputs.push_str("[a]");
    }
    graph.push(format!(
        "{}concat=n={}:v={}:a={}{}",
        chain,
        job.inputs.len(),
        u8::from(keep_video),
        u8::from(keep_audio),
        outputs
    ));
    graph.join(";")
}

fn is_mp4_output(job: &RenderJob) -> bool {
    job.output
        .extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case("mp4"))
        .unwrap_or(false)
}

//! Frame source backed by the `ffprobe` and `ffmpeg` programs.
//!
//! Opening a video probes its first video stream. Each frame read runs one
//! `ffmpeg` process that decodes a single frame to raw RGB24 on stdout.

use image::RgbImage;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use super::{FrameSource, FrameSourceError, VideoDecoder};
use crate::config::DecoderConfig;

pub struct FfmpegDecoder {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegDecoder {
    pub fn new(config: &DecoderConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
        }
    }

    fn probe(&self, path: &Path, count_frames: bool) -> Result<StreamProperties, FrameSourceError> {
        let entries = if count_frames {
            "stream=width,height,r_frame_rate,nb_read_frames"
        } else {
            "stream=width,height,r_frame_rate,nb_frames"
        };

        let mut cmd = Command::new(&self.ffprobe);
        cmd.args(["-v", "error", "-select_streams", "v:0"]);
        if count_frames {
            cmd.arg("-count_frames");
        }
        cmd.args(["-show_entries", entries, "-of", "json"]).arg(path);

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|source| FrameSourceError::Spawn {
                program: self.ffprobe.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FrameSourceError::Probe(stderr.trim().to_string()));
        }

        stream_properties(&output.stdout)
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, FrameSourceError> {
        let mut props = self.probe(path, false)?;
        if props.frame_count.is_none() {
            // Containers like mkv carry no frame count; decode the stream to count.
            debug!("Counting frames of {:?}", path);
            props.frame_count = self.probe(path, true)?.frame_count;
        }
        // Without a count the run would clamp to nothing and still be marked done.
        let frame_count = props
            .frame_count
            .ok_or_else(|| FrameSourceError::Probe("unknown frame count".to_string()))?;

        Ok(Box::new(FfmpegSource {
            ffmpeg: self.ffmpeg.clone(),
            path: path.to_path_buf(),
            width: props.width,
            height: props.height,
            frame_count,
            frame_rate: props.frame_rate,
        }))
    }
}

struct FfmpegSource {
    ffmpeg: String,
    path: PathBuf,
    width: u32,
    height: u32,
    frame_count: u64,
    frame_rate: Option<f64>,
}

impl FrameSource for FfmpegSource {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn read_frame_at(&mut self, index: u64) -> Option<RgbImage> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(self.frame_args(index));

        let output = match cmd.stdin(Stdio::null()).stderr(Stdio::null()).output() {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {}: {}", self.ffmpeg, e);
                return None;
            }
        };
        if !output.status.success() {
            debug!("ffmpeg could not decode frame {} of {:?}", index, self.path);
            return None;
        }

        let expected = self.width as usize * self.height as usize * 3;
        if expected == 0 || output.stdout.len() < expected {
            debug!(
                "Short frame {} of {:?}: {} of {} bytes",
                index,
                self.path,
                output.stdout.len(),
                expected
            );
            return None;
        }

        let mut pixels = output.stdout;
        pixels.truncate(expected);
        RgbImage::from_raw(self.width, self.height, pixels)
    }
}

impl FfmpegSource {
    /// Arguments decoding frame `index` to raw RGB24 on stdout.
    ///
    /// Auto-rotation is disabled so decoded frames keep the coded size that
    /// ffprobe reported.
    fn frame_args(&self, index: u64) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-noautorotate"]
            .into_iter()
            .map(OsString::from)
            .collect();

        match self.frame_rate {
            Some(rate) => {
                // Half a frame early so rounding never lands on the next frame.
                let seconds = ((index as f64 - 0.5) / rate).max(0.0);
                args.push("-ss".into());
                args.push(format!("{:.6}", seconds).into());
                args.push("-i".into());
                args.push(self.path.clone().into_os_string());
            }
            None => {
                args.push("-i".into());
                args.push(self.path.clone().into_os_string());
                args.push("-vf".into());
                args.push(format!("select=eq(n\\,{})", index).into());
                args.push("-vsync".into());
                args.push("vfr".into());
            }
        }

        args.extend(
            ["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]
                .into_iter()
                .map(OsString::from),
        );
        args
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_frames: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct StreamProperties {
    width: u32,
    height: u32,
    frame_count: Option<u64>,
    frame_rate: Option<f64>,
}

fn stream_properties(json: &[u8]) -> Result<StreamProperties, FrameSourceError> {
    let probe: ProbeOutput = serde_json::from_slice(json)?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or(FrameSourceError::NoVideoStream)?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(FrameSourceError::NoVideoStream),
    };

    let frame_count = stream
        .nb_frames
        .or(stream.nb_read_frames)
        .and_then(|n| n.trim().parse::<u64>().ok());

    Ok(StreamProperties {
        width,
        height,
        frame_count,
        frame_rate: stream.r_frame_rate.as_deref().and_then(parse_rate),
    })
}

/// Parse an ffprobe rational such as `30000/1001`.
fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some(num / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        let ntsc = parse_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("25"), None);
    }

    #[test]
    fn test_stream_properties() {
        let json = br#"{
            "programs": [],
            "streams": [
                { "width": 1280, "height": 720, "r_frame_rate": "25/1", "nb_frames": "250" }
            ]
        }"#;
        let props = stream_properties(json).unwrap();
        assert_eq!(
            props,
            StreamProperties {
                width: 1280,
                height: 720,
                frame_count: Some(250),
                frame_rate: Some(25.0),
            }
        );
    }

    #[test]
    fn test_counted_frames_used_when_header_lacks_count() {
        let json = br#"{"streams": [{ "width": 640, "height": 480, "r_frame_rate": "24/1", "nb_read_frames": "96" }]}"#;
        assert_eq!(stream_properties(json).unwrap().frame_count, Some(96));

        let json = br#"{"streams": [{ "width": 640, "height": 480, "r_frame_rate": "24/1" }]}"#;
        assert_eq!(stream_properties(json).unwrap().frame_count, None);
    }

    #[test]
    fn test_no_video_stream() {
        assert!(matches!(
            stream_properties(br#"{"streams": []}"#),
            Err(FrameSourceError::NoVideoStream)
        ));
        assert!(matches!(stream_properties(br#"{}"#), Err(FrameSourceError::NoVideoStream)));
        assert!(matches!(stream_properties(b"not json"), Err(FrameSourceError::Parse(_))));
    }

    #[test]
    fn test_missing_program_is_unreadable() {
        let decoder = FfmpegDecoder {
            ffmpeg: "videoknife-no-such-ffmpeg".to_string(),
            ffprobe: "videoknife-no-such-ffprobe".to_string(),
        };
        assert!(matches!(
            decoder.open(Path::new("clip.mp4")),
            Err(FrameSourceError::Spawn { .. })
        ));
    }

    fn source(frame_rate: Option<f64>) -> FfmpegSource {
        FfmpegSource {
            ffmpeg: "ffmpeg".to_string(),
            path: PathBuf::from("clip.mp4"),
            width: 1920,
            height: 1080,
            frame_count: 100,
            frame_rate,
        }
    }

    fn args(source: &FfmpegSource, index: u64) -> Vec<String> {
        source
            .frame_args(index)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_frame_args_keep_coded_orientation() {
        let args = args(&source(Some(25.0)), 10);
        let noautorotate = args.iter().position(|a| a == "-noautorotate").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(noautorotate < input);
        assert_eq!(args[input + 1], "clip.mp4");

        let seek = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[seek + 1], "0.380000");
        assert!(seek < input);
        assert!(args.ends_with(&["rgb24".to_string(), "pipe:1".to_string()]));
    }

    #[test]
    fn test_frame_args_select_without_rate() {
        let args = args(&source(None), 7);
        assert!(args.contains(&"-noautorotate".to_string()));
        assert!(!args.contains(&"-ss".to_string()));
        assert!(args.contains(&"select=eq(n\\,7)".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_unknown_frame_count_is_unreadable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let ffprobe = dir.path().join("ffprobe");
        std::fs::write(
            &ffprobe,
            "#!/bin/sh\nprintf '%s' '{\"streams\":[{\"width\":64,\"height\":48,\
             \"r_frame_rate\":\"25/1\",\"nb_frames\":\"N/A\",\"nb_read_frames\":\"N/A\"}]}'\n",
        )
        .unwrap();
        std::fs::set_permissions(&ffprobe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let decoder = FfmpegDecoder {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: ffprobe.to_string_lossy().into_owned(),
        };
        assert!(matches!(
            decoder.open(Path::new("clip.mkv")),
            Err(FrameSourceError::Probe(msg)) if msg.contains("frame count")
        ));
    }
}

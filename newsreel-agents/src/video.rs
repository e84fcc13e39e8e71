//! Video assembly with an external `ffmpeg` binary
//!
//! Each segment is rendered on its own as a slideshow of its images over
//! its narration, with the category and headline burnt in. Intro and outro
//! cards are rendered the same way from a plain colour source, then every
//! part is joined with the concat demuxer into the final vertical video.
//! A still frame of the first news segment is kept as the thumbnail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use newsreel_core::domain::health::ComponentHealth;
use newsreel_core::domain::run::VideoArtifact;
use newsreel_core::domain::segment::ProcessedSegment;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::config::VideoConfig;
use crate::error::{AdapterError, Result};

const ADAPTER: &str = "video";

/// Upper bound for one ffmpeg invocation
const FFMPEG_TIMEOUT: Duration = Duration::from_secs(600);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Narration within this many seconds of its slot is not retimed
const TEMPO_TOLERANCE: f64 = 0.5;

pub const INTRO_SECONDS: f64 = 3.0;
pub const OUTRO_SECONDS: f64 = 2.0;

/// How long the category label stays on screen at the start of a segment
const CATEGORY_LABEL_SECONDS: f64 = 2.0;

const HEADLINE_LINE_CHARS: usize = 32;
const HEADLINE_LINES: usize = 2;

/// Every part shares one audio layout so the concat demuxer can copy streams
const AUDIO_RATE: &str = "44100";

/// One line of text burnt into the picture
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub size: u32,
    pub color: &'static str,
    /// drawtext `y` expression
    pub y: String,
    /// Hides the caption after this many seconds
    pub until: Option<f64>,
}

impl Caption {
    fn new(text: impl Into<String>, size: u32, color: &'static str, y: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size,
            color,
            y: y.into(),
            until: None,
        }
    }
}

/// A full-screen card with text on a plain background and silent audio
#[derive(Debug, Clone, PartialEq)]
pub struct TitleCard {
    pub name: &'static str,
    pub seconds: f64,
    /// Background colour as `0xRRGGBB`
    pub background: &'static str,
    pub captions: Vec<Caption>,
}

impl TitleCard {
    pub fn intro(date: DateTime<Utc>) -> Self {
        Self {
            name: "intro",
            seconds: INTRO_SECONDS,
            background: "0x141E32",
            captions: vec![
                Caption::new("ಕನ್ನಡ ನ್ಯೂಸ್", 96, "gold", "h/2-th-24"),
                Caption::new("KANNADA NEWS", 96, "gold", "h/2+24"),
                Caption::new(date.format("%B %d, %Y").to_string(), 48, "white", "h-th-240"),
            ],
        }
    }

    pub fn outro() -> Self {
        Self {
            name: "outro",
            seconds: OUTRO_SECONDS,
            background: "0x1E1432",
            captions: vec![
                Caption::new("ಧನ್ಯವಾದಗಳು", 84, "gold", "h/2-th-24"),
                Caption::new("THANK YOU", 84, "gold", "h/2+24"),
                Caption::new("SUBSCRIBE FOR MORE NEWS", 44, "white", "h-th-240"),
            ],
        }
    }
}

/// Escapes text for a drawtext option inside a filtergraph
///
/// Quotes become typographic apostrophes since they cannot be escaped inside
/// a quoted value; newlines are flattened.
pub fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\\\\\"),
            ':' => escaped.push_str("\\\\:"),
            ',' | ';' | '[' | ']' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\'' => escaped.push('\u{2019}'),
            '\n' | '\r' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wraps text on word boundaries into at most `max_lines` lines, ending
/// with an ellipsis when it does not fit
pub fn wrap_caption(text: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let length = current.chars().count();
        if length > 0 && length + 1 + word.chars().count() > max_chars {
            if lines.len() + 1 >= max_lines {
                current.push('\u{2026}');
                lines.push(current);
                return lines;
            }
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// `<stem>_thumbnail.jpg` beside the video
pub fn thumbnail_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    video.with_file_name(format!("{}_thumbnail.jpg", stem))
}

/// Composes the final video from processed segments
#[async_trait]
pub trait VideoAssembler: Send + Sync {
    /// Renders `segments` in order into `output`
    async fn assemble(&self, segments: &[ProcessedSegment], output: &Path) -> Result<VideoArtifact>;

    async fn probe(&self) -> ComponentHealth;
}

pub struct FfmpegAssembler {
    config: VideoConfig,
}

impl FfmpegAssembler {
    pub fn new(config: VideoConfig) -> Self {
        Self { config }
    }

    /// ffmpeg arguments rendering one segment into `output`
    pub fn segment_args(&self, segment: &ProcessedSegment, output: &Path) -> Result<Vec<String>> {
        let images: Vec<&Path> = segment
            .images
            .iter()
            .filter_map(|i| i.local_path.as_deref())
            .collect();
        if images.is_empty() {
            return Err(AdapterError::Assembly(format!(
                "segment '{}' has no downloaded images",
                segment.category
            )));
        }

        let audio = segment.audio.as_ref().ok_or_else(|| {
            AdapterError::Assembly(format!("segment '{}' has no narration", segment.category))
        })?;

        let duration = segment.duration_seconds;
        let per_image = duration / images.len() as f64;
        let (width, height) = (self.config.resolution.width, self.config.resolution.height);

        let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into(), "-loglevel".into(), "error".into()];
        for image in &images {
            args.extend([
                "-loop".into(),
                "1".into(),
                "-t".into(),
                format!("{:.3}", per_image),
                "-i".into(),
                image.display().to_string(),
            ]);
        }
        args.extend(["-i".into(), audio.path.display().to_string()]);

        let mut filter = String::new();
        for i in 0..images.len() {
            filter.push_str(&format!(
                "[{i}:v]scale={width}:{height}:force_original_aspect_ratio=increase,\
                 crop={width}:{height},setsar=1,fps={fps}[v{i}];",
                fps = self.config.fps
            ));
        }
        for i in 0..images.len() {
            filter.push_str(&format!("[v{}]", i));
        }
        filter.push_str(&format!("concat=n={}:v=1:a=0[vs];", images.len()));

        let captions: Vec<String> = self
            .segment_captions(segment)
            .iter()
            .map(|c| self.drawtext(c))
            .collect();
        filter.push_str(&format!("[vs]{}[v];", captions.join(",")));

        let audio_index = images.len();
        match tempo_factor(audio.duration_seconds, duration) {
            Some(tempo) => filter.push_str(&format!("[{}:a]atempo={:.3},apad[a]", audio_index, tempo)),
            None => filter.push_str(&format!("[{}:a]apad[a]", audio_index)),
        }

        args.extend([
            "-filter_complex".into(),
            filter,
            "-map".into(),
            "[v]".into(),
            "-map".into(),
            "[a]".into(),
        ]);
        args.extend(self.encode_args(duration, output));

        Ok(args)
    }

    /// ffmpeg arguments rendering a title card into `output`
    pub fn card_args(&self, card: &TitleCard, output: &Path) -> Vec<String> {
        let captions: Vec<String> = card.captions.iter().map(|c| self.drawtext(c)).collect();

        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            format!(
                "color=c={}:s={}x{}:r={}:d={:.3}",
                card.background,
                self.config.resolution.width,
                self.config.resolution.height,
                self.config.fps,
                card.seconds
            ),
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            format!("anullsrc=r={}:cl=stereo", AUDIO_RATE),
            "-filter_complex".into(),
            format!("[0:v]{}[v]", captions.join(",")),
            "-map".into(),
            "[v]".into(),
            "-map".into(),
            "1:a".into(),
        ];
        args.extend(self.encode_args(card.seconds, output));
        args
    }

    /// ffmpeg arguments grabbing one frame of `video` at `at_seconds`
    pub fn thumbnail_args(video: &Path, at_seconds: f64, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-ss".into(),
            format!("{:.3}", at_seconds),
            "-i".into(),
            video.display().to_string(),
            "-frames:v".into(),
            "1".into(),
            "-q:v".into(),
            "2".into(),
            output.display().to_string(),
        ]
    }

    /// Category label for the first seconds, headline for the whole segment
    fn segment_captions(&self, segment: &ProcessedSegment) -> Vec<Caption> {
        let mut captions = vec![Caption {
            until: Some(CATEGORY_LABEL_SECONDS),
            ..Caption::new(
                segment.category.display_name().to_uppercase(),
                56,
                "white",
                "160",
            )
        }];

        let lines = wrap_caption(&segment.headline, HEADLINE_LINE_CHARS, HEADLINE_LINES);
        let count = lines.len();
        for (i, line) in lines.into_iter().enumerate() {
            let from_bottom = 240 + (count - 1 - i) * 64;
            captions.push(Caption::new(line, 48, "white", format!("h-th-{}", from_bottom)));
        }

        captions
    }

    fn drawtext(&self, caption: &Caption) -> String {
        let mut filter = format!(
            "drawtext=expansion=none:text={}:fontsize={}:fontcolor={}:borderw=3:bordercolor=black:x=(w-text_w)/2:y={}",
            escape_drawtext(&caption.text),
            caption.size,
            caption.color,
            caption.y
        );
        if let Some(font) = &self.config.font_file {
            filter.push_str(&format!(":fontfile={}", escape_drawtext(&font.display().to_string())));
        }
        if let Some(until) = caption.until {
            filter.push_str(&format!(":enable='lt(t,{})'", until));
        }
        filter
    }

    /// Output options shared by every part
    fn encode_args(&self, seconds: f64, output: &Path) -> Vec<String> {
        vec![
            "-t".into(),
            format!("{:.3}", seconds),
            "-r".into(),
            self.config.fps.to_string(),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "128k".into(),
            "-ar".into(),
            AUDIO_RATE.into(),
            "-ac".into(),
            "2".into(),
            output.display().to_string(),
        ]
    }

    async fn render_card(&self, card: &TitleCard, parts_dir: &Path, index: usize) -> Result<PathBuf> {
        let part = parts_dir.join(format!("{:02}_{}.mp4", index, card.name));
        self.run_ffmpeg(&self.card_args(card, &part)).await?;
        Ok(part)
    }

    /// Extracts the thumbnail; a failure only loses the thumbnail
    async fn extract_thumbnail(&self, video: &Path) -> Option<PathBuf> {
        let at = if self.config.title_cards {
            INTRO_SECONDS + 1.0
        } else {
            1.0
        };
        let output = thumbnail_path(video);

        match self.run_ffmpeg(&Self::thumbnail_args(video, at, &output)).await {
            Ok(()) => Some(output),
            Err(e) => {
                warn!(path = %video.display(), "Thumbnail not extracted: {}", e);
                None
            }
        }
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<()> {
        debug!(bin = %self.config.ffmpeg_bin, "Running ffmpeg {}", args.join(" "));

        let child = Command::new(&self.config.ffmpeg_bin)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(FFMPEG_TIMEOUT, child)
            .await
            .map_err(|_| AdapterError::Assembly(format!("ffmpeg timed out after {:?}", FFMPEG_TIMEOUT)))?
            .map_err(|e| AdapterError::Assembly(format!("failed to start {}: {}", self.config.ffmpeg_bin, e)))?;

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let error_msg = format!("ffmpeg exited with code {}: {}", exit_code, stderr_tail(&stderr));

            error!("{}", error_msg);
            return Err(AdapterError::Assembly(error_msg));
        }

        Ok(())
    }
}

/// Speed-up or slow-down applied to narration that does not fit its slot,
/// within the range ffmpeg's `atempo` accepts
pub fn tempo_factor(audio_seconds: f64, slot_seconds: f64) -> Option<f64> {
    if audio_seconds <= 0.0 || slot_seconds <= 0.0 {
        return None;
    }
    if (audio_seconds - slot_seconds).abs() < TEMPO_TOLERANCE {
        return None;
    }
    Some((audio_seconds / slot_seconds).clamp(0.5, 2.0))
}

/// Input file for the concat demuxer
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', "'\\''")))
        .collect()
}

/// Last few lines of ffmpeg's stderr
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    lines[lines.len().saturating_sub(5)..].join(" | ")
}

#[async_trait]
impl VideoAssembler for FfmpegAssembler {
    async fn assemble(&self, segments: &[ProcessedSegment], output: &Path) -> Result<VideoArtifact> {
        if segments.is_empty() {
            return Err(AdapterError::Validation("no segments to assemble".to_string()));
        }

        let parts_dir = output.with_extension("parts");
        tokio::fs::create_dir_all(&parts_dir).await?;

        let mut parts = Vec::with_capacity(segments.len() + 2);
        if self.config.title_cards {
            parts.push(self.render_card(&TitleCard::intro(Utc::now()), &parts_dir, 0).await?);
        }
        for (index, segment) in segments.iter().enumerate() {
            let part = parts_dir.join(format!("{:02}_{}.mp4", index + 1, segment.category));
            let args = self.segment_args(segment, &part)?;
            self.run_ffmpeg(&args).await?;
            parts.push(part);
        }
        if self.config.title_cards {
            let index = segments.len() + 1;
            parts.push(self.render_card(&TitleCard::outro(), &parts_dir, index).await?);
        }

        let list_path = parts_dir.join("segments.txt");
        tokio::fs::write(&list_path, concat_list(&parts)).await?;

        let concat_args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_path.display().to_string(),
            "-c".into(),
            "copy".into(),
            "-movflags".into(),
            "+faststart".into(),
            output.display().to_string(),
        ];
        self.run_ffmpeg(&concat_args).await?;

        let size_bytes = tokio::fs::metadata(output).await?.len();
        if size_bytes == 0 {
            return Err(AdapterError::Assembly("ffmpeg produced an empty file".to_string()));
        }

        if let Err(e) = tokio::fs::remove_dir_all(&parts_dir).await {
            debug!(path = %parts_dir.display(), "Failed to clean segment files: {}", e);
        }

        let thumbnail = self.extract_thumbnail(output).await;

        let mut duration_seconds: f64 = segments.iter().map(|s| s.duration_seconds).sum();
        if self.config.title_cards {
            duration_seconds += INTRO_SECONDS + OUTRO_SECONDS;
        }
        info!(
            path = %output.display(),
            size_bytes,
            duration_seconds,
            "Video assembled"
        );

        Ok(VideoArtifact {
            path: output.to_path_buf(),
            duration_seconds,
            width: self.config.resolution.width,
            height: self.config.resolution.height,
            fps: self.config.fps,
            size_bytes,
            thumbnail,
        })
    }

    async fn probe(&self) -> ComponentHealth {
        let child = Command::new(&self.config.ffmpeg_bin)
            .arg("-version")
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(PROBE_TIMEOUT, child).await {
            Ok(Ok(output)) if output.status.success() => ComponentHealth::healthy(ADAPTER),
            Ok(Ok(output)) => ComponentHealth::unreachable(
                ADAPTER,
                format!("{} -version exited with {}", self.config.ffmpeg_bin, output.status),
            ),
            Ok(Err(e)) => ComponentHealth::unreachable(
                ADAPTER,
                format!("{} not available: {}", self.config.ffmpeg_bin, e),
            ),
            Err(_) => ComponentHealth::unreachable(ADAPTER, "ffmpeg -version timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsreel_core::domain::article::Category;
    use newsreel_core::domain::health::Reachability;
    use newsreel_core::domain::segment::{AudioRef, ImageRef};

    fn segment_with_media(images: usize, audio_seconds: f64) -> ProcessedSegment {
        let mut segment = ProcessedSegment::new(Category::Karnataka, "Headline", "Summary", 10.0);
        segment.audio = Some(AudioRef {
            path: PathBuf::from("/cache/audio/karnataka.mp3"),
            duration_seconds: audio_seconds,
        });
        segment.images = (0..images)
            .map(|i| ImageRef {
                id: i.to_string(),
                provider: "unsplash".to_string(),
                url: format!("https://images.example/{}", i),
                description: None,
                local_path: Some(PathBuf::from(format!("/cache/media/{}.jpg", i))),
            })
            .collect();
        segment
    }

    #[test]
    fn test_segment_args_splits_duration_between_images() {
        let assembler = FfmpegAssembler::new(VideoConfig::default());
        let args = assembler
            .segment_args(&segment_with_media(2, 10.0), Path::new("/out/part.mp4"))
            .unwrap();

        let image_durations: Vec<_> = args
            .windows(2)
            .filter(|w| w[0] == "-t")
            .map(|w| w[1].as_str())
            .collect();
        assert_eq!(image_durations, vec!["5.000", "5.000", "10.000"]);

        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(filter.contains("scale=1080:1920"));
        assert!(filter.contains("concat=n=2:v=1:a=0[vs];[vs]drawtext="));
        assert!(filter.ends_with("[2:a]apad[a]"));
        assert_eq!(args.last().map(String::as_str), Some("/out/part.mp4"));
    }

    #[test]
    fn test_segment_args_burn_in_category_and_headline() {
        let assembler = FfmpegAssembler::new(VideoConfig::default());
        let mut segment = segment_with_media(1, 10.0);
        segment.headline = "Flood relief camps open across coastal Karnataka districts".to_string();

        let args = assembler
            .segment_args(&segment, Path::new("/out/part.mp4"))
            .unwrap();
        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];

        assert!(filter.contains("text=KARNATAKA NEWS:fontsize=56"));
        assert!(filter.contains("enable='lt(t,2)'"));
        assert!(filter.contains("text=Flood relief camps open across:fontsize=48"));
        assert!(filter.contains("y=h-th-304"));
        assert!(filter.contains("text=coastal Karnataka districts:fontsize=48"));
        assert!(filter.contains("y=h-th-240"));
        assert!(!filter.contains("fontfile="));
    }

    #[test]
    fn test_card_args_render_text_over_colour_source() {
        let assembler = FfmpegAssembler::new(VideoConfig {
            font_file: Some(PathBuf::from("/fonts/NotoSansKannada-Bold.ttf")),
            ..VideoConfig::default()
        });
        let args = assembler.card_args(&TitleCard::outro(), Path::new("/out/outro.mp4"));

        assert!(args.contains(&"color=c=0x1E1432:s=1080x1920:r=30:d=2.000".to_string()));
        assert!(args.contains(&"anullsrc=r=44100:cl=stereo".to_string()));

        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(filter.starts_with("[0:v]drawtext="));
        assert!(filter.ends_with("[v]"));
        assert!(filter.contains("text=ಧನ್ಯವಾದಗಳು"));
        assert!(filter.contains("text=SUBSCRIBE FOR MORE NEWS"));
        assert!(filter.contains(r"fontfile=/fonts/NotoSansKannada-Bold.ttf"));

        let durations: Vec<_> = args.windows(2).filter(|w| w[0] == "-t").map(|w| w[1].as_str()).collect();
        assert_eq!(durations, vec!["2.000"]);
    }

    #[test]
    fn test_intro_card_shows_date() {
        let date = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 10, 17, 6, 0, 0).unwrap();
        let intro = TitleCard::intro(date);
        assert_eq!(intro.seconds, INTRO_SECONDS);
        assert_eq!(intro.captions[2].text, "October 17, 2026");
    }

    #[test]
    fn test_escape_drawtext() {
        assert_eq!(escape_drawtext("It's 5:30, [live]"), r"It’s 5\\:30\, \[live\]");
        assert_eq!(escape_drawtext("a\\b\nc"), r"a\\\\b c");
    }

    #[test]
    fn test_wrap_caption() {
        assert_eq!(wrap_caption("Metro opens", 20, 2), vec!["Metro opens"]);
        assert_eq!(
            wrap_caption("Flood relief camps open across coastal Karnataka districts today", 20, 2),
            vec!["Flood relief camps", "open across coastal\u{2026}"]
        );
        assert!(wrap_caption("   ", 20, 2).is_empty());
    }

    #[test]
    fn test_thumbnail_path_sits_beside_video() {
        assert_eq!(
            thumbnail_path(Path::new("/data/video/run-1.mp4")),
            PathBuf::from("/data/video/run-1_thumbnail.jpg")
        );
        let args = FfmpegAssembler::thumbnail_args(
            Path::new("/data/video/run-1.mp4"),
            4.0,
            Path::new("/data/video/run-1_thumbnail.jpg"),
        );
        assert_eq!(&args[4..6], &["-ss".to_string(), "4.000".to_string()]);
        assert!(args.contains(&"-frames:v".to_string()));
    }

    #[test]
    fn test_segment_args_retimes_long_narration() {
        let assembler = FfmpegAssembler::new(VideoConfig::default());
        let args = assembler
            .segment_args(&segment_with_media(1, 12.0), Path::new("/out/part.mp4"))
            .unwrap();
        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(filter.contains("atempo=1.200"));
    }

    #[test]
    fn test_segment_args_requires_media() {
        let assembler = FfmpegAssembler::new(VideoConfig::default());

        let err = assembler
            .segment_args(&segment_with_media(0, 10.0), Path::new("/out/part.mp4"))
            .unwrap_err();
        assert!(matches!(err, AdapterError::Assembly(_)));

        let mut silent = segment_with_media(2, 10.0);
        silent.audio = None;
        assert!(assembler.segment_args(&silent, Path::new("/out/part.mp4")).is_err());
    }

    #[test]
    fn test_tempo_factor() {
        assert_eq!(tempo_factor(10.2, 10.0), None);
        assert_eq!(tempo_factor(15.0, 10.0), Some(1.5));
        assert_eq!(tempo_factor(40.0, 10.0), Some(2.0));
        assert_eq!(tempo_factor(0.0, 10.0), None);
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/a/one.mp4"), PathBuf::from("/a/it's.mp4")]);
        assert_eq!(list, "file '/a/one.mp4'\nfile '/a/it'\\''s.mp4'\n");
    }

    #[tokio::test]
    async fn test_probe_missing_binary_is_unreachable() {
        let assembler = FfmpegAssembler::new(VideoConfig {
            ffmpeg_bin: "/nonexistent/ffmpeg".to_string(),
            ..VideoConfig::default()
        });
        let health = assembler.probe().await;
        assert_eq!(health.status, Reachability::Unreachable);
    }

    #[tokio::test]
    async fn test_assemble_without_binary_fails_with_assembly_error() {
        let dir = std::env::temp_dir().join(format!("newsreel-video-{}", uuid::Uuid::new_v4()));
        let assembler = FfmpegAssembler::new(VideoConfig {
            ffmpeg_bin: "/nonexistent/ffmpeg".to_string(),
            ..VideoConfig::default()
        });

        let err = assembler
            .assemble(&[segment_with_media(1, 10.0)], &dir.join("video.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Assembly(_)));

        let _ = std::fs::remove_dir_all(dir);
    }
}

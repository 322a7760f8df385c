//! Translation of user-facing format/quality choices into yt-dlp invocations.

use std::path::{Path, PathBuf};

use crate::progress::PROGRESS_TEMPLATE;

/// Substituted when the remote resource has no usable title.
pub const FALLBACK_TITLE: &str = "video";

/// Output format chosen by the user.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FormatKind {
    /// Audio track only, extracted to mp3
    Audio,
    /// Video stream only, no audio track
    VideoOnly,
    /// Muxed video + audio in an mp4 container
    VideoAudio,
}

/// One entry of a fixed quality table: display label plus its numeric value
/// (target bitrate in kbps for audio, maximum height in pixels for video).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct QualityOption {
    pub label: &'static str,
    pub value: u32,
}

const fn quality(label: &'static str, value: u32) -> QualityOption {
    QualityOption { label, value }
}

pub const AUDIO_QUALITIES: [QualityOption; 3] = [
    quality("128 kbps", 128),
    quality("192 kbps", 192),
    quality("320 kbps", 320),
];

pub const VIDEO_QUALITIES: [QualityOption; 8] = [
    quality("144p", 144),
    quality("240p", 240),
    quality("360p", 360),
    quality("480p", 480),
    quality("720p", 720),
    quality("1080p", 1080),
    quality("1440p", 1440),
    quality("2160p", 2160),
];

impl FormatKind {
    pub const ALL: [FormatKind; 3] = [
        FormatKind::Audio,
        FormatKind::VideoOnly,
        FormatKind::VideoAudio,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormatKind::Audio => "Audio (MP3)",
            FormatKind::VideoOnly => "Video (No Audio)",
            FormatKind::VideoAudio => "Video + Audio",
        }
    }

    /// Caption shown above the quality dropdown.
    pub fn quality_caption(self) -> &'static str {
        match self {
            FormatKind::Audio => "Select Audio Quality:",
            _ => "Select Max Video Quality:",
        }
    }

    /// The quality table applicable to this format.
    pub fn quality_options(self) -> &'static [QualityOption] {
        match self {
            FormatKind::Audio => &AUDIO_QUALITIES,
            _ => &VIDEO_QUALITIES,
        }
    }

    /// Preselected quality when this format becomes active.
    pub fn default_quality(self) -> QualityOption {
        match self {
            FormatKind::Audio => AUDIO_QUALITIES[1],  // 192 kbps
            _ => VIDEO_QUALITIES[5],                  // 1080p
        }
    }

    /// Coarse media kind, used as the output subdirectory name.
    pub fn media_subdir(self) -> &'static str {
        match self {
            FormatKind::Audio => "audio",
            _ => "video",
        }
    }
}

/// One user-initiated download. Immutable once handed to the worker.
pub struct DownloadRequest {
    pub url: String,
    pub format: FormatKind,
    pub quality: QualityOption,
}

/// A fully translated engine invocation: the argument vector for yt-dlp and
/// the directory the result lands in.
pub struct DownloadConfig {
    pub args: Vec<String>,
    pub out_dir: PathBuf,
}

impl DownloadConfig {
    /// Derives the engine invocation from a request and the sanitized title.
    /// The format kind alone decides which post-processing flags are attached.
    pub fn build(request: &DownloadRequest, title: &str) -> Self {
        let out_dir = Path::new("downloads").join(request.format.media_subdir());
        let template = out_dir.join(format!("{title}.%(ext)s"));

        let mut args: Vec<String> = vec![
            "--newline".into(),
            "--progress-template".into(),
            PROGRESS_TEMPLATE.into(),
            "-o".into(),
            template.to_string_lossy().into_owned(),
        ];

        match request.format {
            FormatKind::Audio => {
                args.extend(
                    [
                        "-f",
                        "bestaudio/best",
                        "--extract-audio",
                        "--audio-format",
                        "mp3",
                        "--audio-quality",
                    ]
                    .map(String::from),
                );
                args.push(format!("{}K", request.quality.value));
                args.extend(
                    [
                        "--write-thumbnail",
                        "--embed-thumbnail",
                        "--postprocessor-args",
                        "-id3v2_version 3",
                    ]
                    .map(String::from),
                );
            }
            FormatKind::VideoOnly => {
                args.push("-f".into());
                args.push(format!(
                    "bestvideo[ext=mp4][height<={}]",
                    request.quality.value
                ));
            }
            FormatKind::VideoAudio => {
                args.push("-f".into());
                args.push(format!(
                    "bestvideo[ext=mp4][height<={}]+bestaudio[ext=m4a]/bestaudio",
                    request.quality.value
                ));
                // Container conversion runs even when the merge already produced
                // mp4, matching the original behavior.
                args.extend(
                    ["--merge-output-format", "mp4", "--recode-video", "mp4"].map(String::from),
                );
            }
        }

        args.push(request.url.clone());
        Self { args, out_dir }
    }
}

/// Removes the characters that are unsafe in file names on the supported
/// platforms. Everything else passes through untouched.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect()
}

pub fn ensure_output_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(format: FormatKind, quality: QualityOption) -> DownloadRequest {
        DownloadRequest {
            url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            format,
            quality,
        }
    }

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn audio_labels_match_numeric_prefix() {
        for option in AUDIO_QUALITIES {
            let prefix: u32 = option
                .label
                .strip_suffix(" kbps")
                .expect("audio label suffix")
                .parse()
                .expect("audio label prefix");
            assert_eq!(prefix, option.value);
        }
    }

    #[test]
    fn video_labels_match_numeric_prefix() {
        for option in VIDEO_QUALITIES {
            let prefix: u32 = option
                .label
                .strip_suffix('p')
                .expect("video label suffix")
                .parse()
                .expect("video label prefix");
            assert_eq!(prefix, option.value);
        }
    }

    #[test]
    fn default_quality_is_member_of_option_set() {
        for format in FormatKind::ALL {
            assert!(format.quality_options().contains(&format.default_quality()));
        }
    }

    #[test]
    fn default_qualities_match_expected_labels() {
        assert_eq!(FormatKind::Audio.default_quality().label, "192 kbps");
        assert_eq!(FormatKind::VideoOnly.default_quality().label, "1080p");
        assert_eq!(FormatKind::VideoAudio.default_quality().label, "1080p");
    }

    #[test]
    fn sanitize_removes_unsafe_characters() {
        assert_eq!(sanitize_title(r#"a\b/c*d?e:f"g<h>i|j"#), "abcdefghij");
    }

    #[test]
    fn sanitize_leaves_other_characters_alone() {
        let title = "Ünïcøde — spaces, dots. and (parens) [brackets] 100%";
        assert_eq!(sanitize_title(title), title);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_title(r#"My "Video": part 2/3?"#);
        assert_eq!(sanitize_title(&once), once);
    }

    #[test]
    fn audio_config_matches_request() {
        let config = DownloadConfig::build(
            &request(FormatKind::Audio, AUDIO_QUALITIES[1]),
            "My Video",
        );

        assert_eq!(config.out_dir, Path::new("downloads").join("audio"));
        assert_eq!(arg_after(&config.args, "-f"), Some("bestaudio/best"));
        assert_eq!(arg_after(&config.args, "--audio-format"), Some("mp3"));
        assert_eq!(arg_after(&config.args, "--audio-quality"), Some("192K"));
        assert!(config.args.iter().any(|a| a == "--embed-thumbnail"));
        assert!(config.args.iter().any(|a| a == "--write-thumbnail"));

        let template = arg_after(&config.args, "-o").expect("output template");
        assert!(template.ends_with("My Video.%(ext)s"));
        assert!(template.contains("audio"));
    }

    #[test]
    fn video_only_config_has_height_ceiling_and_no_audio() {
        let config = DownloadConfig::build(
            &request(FormatKind::VideoOnly, VIDEO_QUALITIES[4]),
            "clip",
        );

        assert_eq!(
            arg_after(&config.args, "-f"),
            Some("bestvideo[ext=mp4][height<=720]")
        );
        assert!(!config.args.iter().any(|a| a.contains("bestaudio")));
        assert!(!config.args.iter().any(|a| a == "--extract-audio"));
        assert_eq!(config.out_dir, Path::new("downloads").join("video"));
    }

    #[test]
    fn muxed_config_combines_streams_and_normalizes_container() {
        let config = DownloadConfig::build(
            &request(FormatKind::VideoAudio, VIDEO_QUALITIES[5]),
            "clip",
        );

        assert_eq!(
            arg_after(&config.args, "-f"),
            Some("bestvideo[ext=mp4][height<=1080]+bestaudio[ext=m4a]/bestaudio")
        );
        assert_eq!(arg_after(&config.args, "--merge-output-format"), Some("mp4"));
        assert_eq!(arg_after(&config.args, "--recode-video"), Some("mp4"));
    }

    #[test]
    fn post_processing_flags_are_mutually_exclusive() {
        let audio = DownloadConfig::build(&request(FormatKind::Audio, AUDIO_QUALITIES[0]), "t");
        let video = DownloadConfig::build(&request(FormatKind::VideoOnly, VIDEO_QUALITIES[0]), "t");
        let muxed = DownloadConfig::build(&request(FormatKind::VideoAudio, VIDEO_QUALITIES[0]), "t");

        assert!(!audio.args.iter().any(|a| a == "--recode-video"));
        assert!(!video.args.iter().any(|a| a == "--extract-audio" || a == "--recode-video"));
        assert!(!muxed.args.iter().any(|a| a == "--extract-audio" || a == "--embed-thumbnail"));
    }

    #[test]
    fn url_is_the_final_argument() {
        let req = request(FormatKind::VideoAudio, VIDEO_QUALITIES[5]);
        let config = DownloadConfig::build(&req, "clip");
        assert_eq!(config.args.last().map(String::as_str), Some(req.url.as_str()));
    }

    #[test]
    fn ensure_output_dir_creates_missing_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let nested = tmp.path().join("downloads").join("audio");
        ensure_output_dir(&nested).expect("create");
        assert!(nested.is_dir());
        // A second call on an existing directory is fine.
        ensure_output_dir(&nested).expect("idempotent");
    }
}

use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoProvider {
    YouTube,
    Vimeo,
    Dailymotion,
    Loom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoEmbed {
    pub provider: VideoProvider,
    pub embed_url: String,
}

/// Maps a watch-page url to an embeddable player url.
pub trait VideoEmbedResolver {
    fn resolve(&self, url: &str) -> Option<VideoEmbed>;
}

/// Recognizes the url shapes of the common hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownHostsResolver;

fn is_video_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn embed(provider: VideoProvider, embed_url: String) -> Option<VideoEmbed> {
    Some(VideoEmbed { provider, embed_url })
}

impl VideoEmbedResolver for KnownHostsResolver {
    fn resolve(&self, url: &str) -> Option<VideoEmbed> {
        let parsed = Url::parse(url.trim()).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match host {
            "youtube.com" | "youtube-nocookie.com" => {
                let id = match segments.as_slice() {
                    ["watch"] => parsed
                        .query_pairs()
                        .find(|(key, _)| key == "v")
                        .map(|(_, value)| value.into_owned())?,
                    ["embed" | "shorts" | "live", id, ..] => id.to_string(),
                    _ => return None,
                };
                if !is_video_id(&id) {
                    return None;
                }
                embed(VideoProvider::YouTube, format!("https://www.youtube.com/embed/{id}"))
            }
            "youtu.be" => {
                let id = segments.first().filter(|id| is_video_id(id))?;
                embed(VideoProvider::YouTube, format!("https://www.youtube.com/embed/{id}"))
            }
            "vimeo.com" => {
                let id = segments.iter().rev().find(|s| s.chars().all(|c| c.is_ascii_digit()))?;
                embed(VideoProvider::Vimeo, format!("https://player.vimeo.com/video/{id}"))
            }
            "player.vimeo.com" => match segments.as_slice() {
                ["video", id, ..] if id.chars().all(|c| c.is_ascii_digit()) => {
                    embed(VideoProvider::Vimeo, format!("https://player.vimeo.com/video/{id}"))
                }
                _ => None,
            },
            "dailymotion.com" => match segments.as_slice() {
                ["video", id, ..] | ["embed", "video", id, ..] => {
                    let id = id.split('_').next().filter(|id| is_video_id(id))?;
                    embed(
                        VideoProvider::Dailymotion,
                        format!("https://www.dailymotion.com/embed/video/{id}"),
                    )
                }
                _ => None,
            },
            "dai.ly" => {
                let id = segments.first().filter(|id| is_video_id(id))?;
                embed(
                    VideoProvider::Dailymotion,
                    format!("https://www.dailymotion.com/embed/video/{id}"),
                )
            }
            "loom.com" => match segments.as_slice() {
                ["share" | "embed", id, ..] if is_video_id(id) => {
                    embed(VideoProvider::Loom, format!("https://www.loom.com/embed/{id}"))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

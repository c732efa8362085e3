//! Keyless translate-TTS endpoint with a per-request character limit.
//!
//! Long text is chunked, each chunk fetched as MP3, and the chunks joined
//! in order with a stream-copy concat.

use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use super::chunking::split_text;
use super::{SpeechBackend, SynthesisError, SynthesisResult};
use crate::clients::http::{build_client, check_status};
use crate::config::SynthesisSettings;
use crate::media::{concat_segments, MediaTools};
use crate::models::SynthesisProvider;

/// The endpoint refuses non-browser agents.
const BROWSER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

pub struct TranslateTts {
    client: Client,
    endpoint: String,
    chunk_chars: usize,
    tools: MediaTools,
}

impl TranslateTts {
    pub fn new(settings: &SynthesisSettings, tools: MediaTools) -> SynthesisResult<Self> {
        Ok(Self {
            client: build_client(settings.timeout())?,
            endpoint: settings.fallback_endpoint.clone(),
            chunk_chars: settings.fallback_chunk_chars.max(1),
            tools,
        })
    }

    fn fetch_chunk(&self, chunk: &str, language: &str, index: usize, total: usize) -> SynthesisResult<Vec<u8>> {
        let index_str = index.to_string();
        let total_str = total.to_string();
        let len_str = chunk.chars().count().to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .header(USER_AGENT, BROWSER_AGENT)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language),
                ("q", chunk),
                ("total", total_str.as_str()),
                ("idx", index_str.as_str()),
                ("textlen", len_str.as_str()),
            ])
            .send()?;
        let bytes = check_status(response)?.bytes()?;
        if bytes.is_empty() {
            return Err(SynthesisError::EmptyChunk { index });
        }
        Ok(bytes.to_vec())
    }
}

impl SpeechBackend for TranslateTts {
    fn provider(&self) -> SynthesisProvider {
        SynthesisProvider::TranslateTts
    }

    fn file_extension(&self) -> &'static str {
        "mp3"
    }

    fn synthesize(&self, text: &str, language: &str, output: &Path) -> SynthesisResult<PathBuf> {
        let chunks = split_text(text, self.chunk_chars);
        if chunks.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let scratch = tempfile::Builder::new()
            .prefix(".tts-")
            .tempdir_in(parent)
            .map_err(|e| SynthesisError::io("creating scratch directory", e))?;

        self.tools.note(&format!(
            "Synthesizing {} chunk(s) of up to {} chars",
            chunks.len(),
            self.chunk_chars
        ));

        let mut segments = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let audio = self.fetch_chunk(chunk, language, index, chunks.len())?;
            let path = scratch.path().join(format!("chunk_{:03}.mp3", index));
            std::fs::write(&path, audio).map_err(|e| SynthesisError::io("writing speech chunk", e))?;
            segments.push(path);
        }

        let joined = if segments.len() == 1 {
            segments.remove(0)
        } else {
            let joined = scratch.path().join("joined.mp3");
            concat_segments(&self.tools, &segments, &scratch.path().join("chunks.txt"), &joined)?;
            joined
        };

        std::fs::rename(&joined, output).map_err(|e| SynthesisError::io("moving speech audio into place", e))?;
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::http::fake_server::{CannedResponse, FakeServer};
    use crate::config::ToolSettings;
    use crate::media::test_support::ffmpeg_available;
    use crate::media::MediaProbe;
    use std::process::{Command, Stdio};
    use tempfile::tempdir;

    fn backend(endpoint: String, chunk_chars: usize) -> TranslateTts {
        let settings = SynthesisSettings {
            fallback_endpoint: endpoint,
            fallback_chunk_chars: chunk_chars,
            timeout_secs: 5,
            ..SynthesisSettings::default()
        };
        TranslateTts::new(&settings, MediaTools::from_settings(&ToolSettings::default())).unwrap()
    }

    fn decode_query(target: &str) -> Vec<(String, String)> {
        let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");
        reqwest::Url::parse(&format!("http://x/?{}", query))
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn param<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
        pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Short mp3 with a sine tone, or None when no mp3 encoder is built in.
    fn mp3_fixture(dir: &Path, name: &str, seconds: f64) -> Option<Vec<u8>> {
        let path = dir.join(name);
        let status = Command::new("ffmpeg")
            .args(["-y", "-hide_banner", "-loglevel", "error", "-f", "lavfi", "-i"])
            .arg(format!("sine=frequency=440:sample_rate=22050:duration={seconds}"))
            .args(["-c:a", "libmp3lame", "-b:a", "64k"])
            .arg(&path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .ok()?;
        if !status.success() {
            return None;
        }
        std::fs::read(&path).ok()
    }

    #[test]
    fn single_chunk_is_written_directly() {
        let server = FakeServer::start(vec![CannedResponse::bytes(
            200,
            "audio/mpeg",
            b"ID3-fake-mp3".to_vec(),
        )]);
        let dir = tempdir().unwrap();
        let output = dir.path().join("speech.mp3");

        let path = backend(server.url("/translate_tts"), 200)
            .synthesize("Hola mundo.", "es", &output)
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3-fake-mp3");

        let requests = server.finish();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].header("user-agent").unwrap().starts_with("Mozilla"));
        let pairs = decode_query(&requests[0].target);
        assert_eq!(param(&pairs, "tl"), Some("es"));
        assert_eq!(param(&pairs, "client"), Some("tw-ob"));
        assert_eq!(param(&pairs, "q"), Some("Hola mundo."));
        assert_eq!(param(&pairs, "total"), Some("1"));

        // Scratch directory is gone
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn empty_chunk_response_is_error() {
        let server = FakeServer::start(vec![CannedResponse::bytes(200, "audio/mpeg", Vec::new())]);
        let dir = tempdir().unwrap();

        let err = backend(server.url("/"), 200)
            .synthesize("Hola.", "es", &dir.path().join("s.mp3"))
            .unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyChunk { index: 0 }));
        server.finish();
    }

    #[test]
    fn chunks_are_requested_and_joined_in_order() {
        if !ffmpeg_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let (Some(first), Some(second)) = (
            mp3_fixture(dir.path(), "a.mp3", 1.0),
            mp3_fixture(dir.path(), "b.mp3", 2.0),
        ) else {
            return;
        };

        let server = FakeServer::start(vec![
            CannedResponse::bytes(200, "audio/mpeg", first),
            CannedResponse::bytes(200, "audio/mpeg", second),
        ]);
        let out_dir = dir.path().join("work");
        std::fs::create_dir_all(&out_dir).unwrap();
        let output = out_dir.join("speech.mp3");

        backend(server.url("/"), 12)
            .synthesize("First part. Second part.", "en", &output)
            .unwrap();

        let requests = server.finish();
        assert_eq!(requests.len(), 2);
        let first_q = decode_query(&requests[0].target);
        let second_q = decode_query(&requests[1].target);
        assert_eq!(param(&first_q, "q"), Some("First part."));
        assert_eq!(param(&first_q, "idx"), Some("0"));
        assert_eq!(param(&second_q, "q"), Some("Second part."));
        assert_eq!(param(&second_q, "idx"), Some("1"));

        let duration = MediaProbe::new(MediaTools::from_settings(&ToolSettings::default()))
            .probe_duration(&output)
            .unwrap();
        assert!((duration - 3.0).abs() < 0.2, "duration {duration}");
    }
}

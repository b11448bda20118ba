use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use whisper_shim::{TranscribeParams, Transcriber, TranscriptSegment, SAMPLE_RATE};

// ============================================================================
// Protocol Messages (JSON over stdin/stdout)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Request {
    Transcribe {
        /// Raw little-endian f32 PCM, mono, 16 kHz.
        audio_path: String,
        model_path: Option<String>,
        language: Option<String>,
        translate: Option<bool>,
        threads: Option<i32>,
    },
    Ping,
    Shutdown,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Response {
    Transcript {
        text: String,
        segments: Vec<TranscriptSegment>,
        error: Option<String>,
    },
    Pong,
    Goodbye,
    Error {
        message: String,
    },
}

// ============================================================================
// Transcriber State Management
// ============================================================================

struct TranscriberState {
    transcriber: Option<Transcriber>,
    model_path: Option<PathBuf>,
    last_activity: Arc<AtomicU64>,
}

impl TranscriberState {
    fn new() -> Self {
        Self {
            transcriber: None,
            model_path: None,
            last_activity: Arc::new(AtomicU64::new(Self::current_timestamp())),
        }
    }

    fn current_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn update_activity(&self) {
        self.last_activity
            .store(Self::current_timestamp(), Ordering::SeqCst);
    }

    fn seconds_since_activity(&self) -> u64 {
        Self::current_timestamp() - self.last_activity.load(Ordering::SeqCst)
    }

    fn load_model_if_needed(&mut self, model_path: PathBuf) -> Result<()> {
        // Check if the model is already loaded
        if let Some(ref loaded_path) = self.model_path {
            if loaded_path == &model_path && self.transcriber.is_some() {
                eprintln!("✓ Model already loaded");
                self.update_activity();
                return Ok(());
            }
        }

        eprintln!("📥 Loading model: {}", model_path.display());

        let transcriber = Transcriber::from_model_file(&model_path)
            .with_context(|| format!("unable to load model at {:?}", model_path))?;

        self.transcriber = Some(transcriber);
        self.model_path = Some(model_path);
        self.update_activity();

        eprintln!("✅ Model loaded successfully");
        Ok(())
    }

    fn transcribe(
        &mut self,
        audio_path: PathBuf,
        language: Option<String>,
        translate: bool,
        threads: Option<i32>,
    ) -> Result<(String, Vec<TranscriptSegment>)> {
        let start_time = Instant::now();
        let transcriber = self.transcriber.as_mut().context("Model not loaded")?;

        let samples = read_samples(&audio_path)?;
        let audio_secs = samples.len() as f64 / f64::from(SAMPLE_RATE);
        eprintln!(
            "🎧 Read {} samples ({:.2}s) from {}",
            samples.len(),
            audio_secs,
            audio_path.display()
        );

        let params = TranscribeParams {
            threads,
            language,
            translate,
            ..TranscribeParams::default()
        };
        transcriber.transcribe(&samples, &params)?;

        let segments: Vec<TranscriptSegment> =
            transcriber.segments().map(TranscriptSegment::from).collect();
        let text = transcriber.full_text();

        // Transcription statistics
        let total_time = start_time.elapsed();
        let rtf = if audio_secs > 0.0 {
            total_time.as_secs_f64() / audio_secs
        } else {
            0.0
        };

        eprintln!("📊 Transcription Statistics:");
        eprintln!("   • Audio duration: {:.2}s", audio_secs);
        eprintln!("   • Segments: {}", segments.len());
        eprintln!("   • Total time: {:.2}s", total_time.as_secs_f64());
        eprintln!("   • Real-time factor: {:.2}x", rtf);
        if let Some(lang) = transcriber.detected_language() {
            eprintln!("   • Language: {}", lang);
        }

        self.update_activity();
        Ok((text, segments))
    }
}

/// Reads a raw audio file: little-endian f32 PCM, mono, 16 kHz. Produce one
/// with e.g. `ffmpeg -i input.wav -f f32le -ac 1 -ar 16000 output.pcm`.
fn read_samples(path: &Path) -> Result<Vec<f32>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("unable to read audio at {:?}", path))?;
    if bytes.len() % 4 != 0 {
        bail!(
            "audio file {:?} is not raw f32le PCM ({} bytes is not a multiple of 4)",
            path,
            bytes.len()
        );
    }
    // fs::read makes no alignment promise, so cast by copy.
    Ok(bytemuck::pod_collect_to_vec::<u8, f32>(&bytes))
}

// ============================================================================
// Main Loop with Keep-Alive Protocol
// ============================================================================

fn send_response(response: &Response) -> Result<()> {
    let json = serde_json::to_string(response)?;
    println!("{}", json);
    io::stdout().flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    // Get idle timeout from environment variable (default 5 minutes)
    let idle_timeout_secs = std::env::var("WHISPER_HELPER_IDLE_TIMEOUT")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(300);

    eprintln!(
        "🎙️ whisper-helper starting (idle timeout: {}s)",
        idle_timeout_secs
    );

    let mut state = TranscriberState::new();

    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();
    let mut buffer = String::new();

    loop {
        // Check idle timeout
        if state.seconds_since_activity() > idle_timeout_secs {
            eprintln!("💤 Idle timeout reached, shutting down");
            send_response(&Response::Goodbye)?;
            break;
        }

        // Read line from stdin
        buffer.clear();
        match stdin_lock.read_line(&mut buffer) {
            Ok(0) => {
                // EOF reached
                eprintln!("📪 EOF received, shutting down");
                break;
            }
            Ok(_) => {
                let line = buffer.trim();
                if line.is_empty() {
                    continue;
                }

                // Parse request
                match serde_json::from_str::<Request>(line) {
                    Ok(Request::Transcribe {
                        audio_path,
                        model_path,
                        language,
                        translate,
                        threads,
                    }) => {
                        // Load model if a path was provided
                        if let Some(path_str) = model_path {
                            let path = PathBuf::from(path_str);
                            if let Err(e) = state.load_model_if_needed(path) {
                                send_response(&Response::Transcript {
                                    text: String::new(),
                                    segments: Vec::new(),
                                    error: Some(format!("Failed to load model: {}", e)),
                                })?;
                                continue;
                            }
                        }

                        match state.transcribe(
                            PathBuf::from(audio_path),
                            language,
                            translate.unwrap_or(false),
                            threads,
                        ) {
                            Ok((text, segments)) => {
                                send_response(&Response::Transcript {
                                    text,
                                    segments,
                                    error: None,
                                })?;
                            }
                            Err(e) => {
                                send_response(&Response::Transcript {
                                    text: String::new(),
                                    segments: Vec::new(),
                                    error: Some(format!("Transcription failed: {}", e)),
                                })?;
                            }
                        }
                    }
                    Ok(Request::Ping) => {
                        state.update_activity();
                        send_response(&Response::Pong)?;
                    }
                    Ok(Request::Shutdown) => {
                        eprintln!("🛑 Shutdown requested");
                        send_response(&Response::Goodbye)?;
                        break;
                    }
                    Err(e) => {
                        eprintln!("❌ Failed to parse request: {}", e);
                        send_response(&Response::Error {
                            message: format!("Invalid request: {}", e),
                        })?;
                    }
                }
            }
            Err(e) => {
                eprintln!("❌ Error reading stdin: {}", e);
                break;
            }
        }
    }

    eprintln!("👋 whisper-helper exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_parse_from_protocol_lines() {
        let req: Request = serde_json::from_str(
            r#"{"type":"transcribe","audio_path":"/tmp/a.pcm","language":"en","threads":4}"#,
        )
        .unwrap();
        match req {
            Request::Transcribe {
                audio_path,
                model_path,
                language,
                translate,
                threads,
            } => {
                assert_eq!(audio_path, "/tmp/a.pcm");
                assert_eq!(language.as_deref(), Some("en"));
                assert_eq!(threads, Some(4));
                assert_eq!(translate, None);
                assert_eq!(model_path, None);
            }
            other => panic!("parsed wrong variant: {:?}", other),
        }

        let req: Request = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(req, Request::Ping));
    }

    #[test]
    fn raw_pcm_files_round_trip_to_samples() {
        let samples = [0.0f32, 0.5, -0.25, 1.0];
        let path = std::env::temp_dir().join(format!("whisper_helper_pcm_{}", std::process::id()));
        std::fs::write(&path, bytemuck::cast_slice::<f32, u8>(&samples)).unwrap();
        let read = read_samples(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(read, samples);
    }

    #[test]
    fn odd_sized_files_are_rejected() {
        let path = std::env::temp_dir().join(format!("whisper_helper_odd_{}", std::process::id()));
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let err = read_samples(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("f32le"));
    }
}

//! Tone output via the cpal backend.
//!
//! # Design constraints
//!
//! The cpal output callback runs on an OS audio thread at elevated priority.
//! It **must not** allocate, block on a mutex, or perform I/O. Tones are
//! therefore rendered on the scheduler side and handed over through an SPSC
//! sample ring whose `try_pop` is lock-free and allocation-free. An empty ring
//! plays silence.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). The stream is therefore built, kept alive and dropped on one
//! dedicated thread. A sync channel reports the open result back to `open`.

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, StreamConfig,
};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tracing::warn;

#[cfg(feature = "audio-cpal")]
use tracing::{debug, error, info};

use super::{complete_after, tone::ToneSynth, ToneCompletion, ToneEmitter};
use crate::{
    buffering::{Producer, SampleProducer},
    error::{MorseError, Result},
};

#[cfg(feature = "audio-cpal")]
use crate::buffering::{create_sample_ring, Consumer, SampleConsumer};

/// How often the output thread checks whether it should release the device.
#[cfg(feature = "audio-cpal")]
const KEEPALIVE_POLL: Duration = Duration::from_millis(50);

/// Tone output settings.
#[derive(Debug, Clone)]
pub struct ToneConfig {
    /// Sine frequency in Hz. Default: 800.
    pub frequency_hz: f32,
    /// Linear amplitude in [0, 1]. Default: 0.8.
    pub volume: f32,
    /// Preferred output device name. `None` uses the system default.
    pub output_device: Option<String>,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 800.0,
            volume: 0.8,
            output_device: None,
        }
    }
}

/// Emitter that sounds tones on an output device.
///
/// The device stays open for the emitter's lifetime; dropping the emitter
/// releases it.
pub struct CpalToneEmitter {
    producer: SampleProducer,
    synth: ToneSynth,
    /// Cleared on drop to let the output thread release the device.
    running: Arc<AtomicBool>,
    /// Cleared by the stream error callback.
    healthy: Arc<AtomicBool>,
}

impl CpalToneEmitter {
    /// Open an output device by preferred name, otherwise fall back to the
    /// default output device and then the first available one.
    ///
    /// Blocks until the device is confirmed open (or fails).
    ///
    /// # Errors
    /// `MorseError::NoOutputDevice` when no speaker is available, or
    /// `MorseError::AudioStream` if cpal fails to build the stream.
    #[cfg(feature = "audio-cpal")]
    pub fn open(config: ToneConfig) -> Result<Self> {
        let (producer, consumer) = create_sample_ring();
        let running = Arc::new(AtomicBool::new(true));
        let healthy = Arc::new(AtomicBool::new(true));

        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<u32>>();
        let thread_running = Arc::clone(&running);
        let thread_healthy = Arc::clone(&healthy);
        let preferred = config.output_device.clone();

        std::thread::Builder::new()
            .name("morsecast-output".into())
            .spawn(move || {
                let stream = match open_stream(consumer, Arc::clone(&thread_healthy), preferred) {
                    Ok((stream, rate)) => {
                        let _ = open_tx.send(Ok(rate));
                        stream
                    }
                    Err(e) => {
                        let _ = open_tx.send(Err(e));
                        thread_running.store(false, Ordering::SeqCst);
                        return;
                    }
                };

                while thread_running.load(Ordering::Relaxed) {
                    std::thread::sleep(KEEPALIVE_POLL);
                }

                // Stream drops here, releasing the device on this thread.
                drop(stream);
                debug!("output device released");
            })?;

        match open_rx.recv() {
            Ok(Ok(sample_rate)) => {
                info!(sample_rate, frequency_hz = config.frequency_hz, "tone output ready");
                Ok(Self {
                    producer,
                    synth: ToneSynth::new(config.frequency_hz, config.volume, sample_rate),
                    running,
                    healthy,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MorseError::Other(anyhow::anyhow!(
                "output thread died before reporting device state"
            ))),
        }
    }

    /// Stub when the `audio-cpal` feature is disabled.
    #[cfg(not(feature = "audio-cpal"))]
    pub fn open(_config: ToneConfig) -> Result<Self> {
        Err(MorseError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }

    /// Actual device sample rate (Hz).
    pub fn sample_rate(&self) -> u32 {
        self.synth.sample_rate()
    }
}

impl ToneEmitter for CpalToneEmitter {
    fn prepare(&mut self) -> Result<()> {
        if !self.running.load(Ordering::Relaxed) {
            return Err(MorseError::EmitterUnavailable(
                "output thread has exited".into(),
            ));
        }
        if !self.healthy.load(Ordering::Relaxed) {
            return Err(MorseError::EmitterUnavailable(
                "output stream reported an error".into(),
            ));
        }
        Ok(())
    }

    fn emit(&mut self, duration: Duration, on_complete: ToneCompletion) -> Result<()> {
        let samples = self.synth.render(duration);
        let written = self.producer.push_slice(&samples);
        if written < samples.len() {
            warn!(
                dropped = samples.len() - written,
                "sample ring full: tone truncated"
            );
        }
        complete_after(duration, on_complete);
        Ok(())
    }
}

impl Drop for CpalToneEmitter {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(feature = "audio-cpal")]
fn open_stream(
    mut consumer: SampleConsumer,
    healthy: Arc<AtomicBool>,
    preferred_device_name: Option<String>,
) -> Result<(cpal::Stream, u32)> {
    use cpal::traits::HostTrait;

    let host = cpal::default_host();
    let mut selected_device = None;

    if let Some(preferred_name) = preferred_device_name.as_deref() {
        match host.output_devices() {
            Ok(mut devices) => {
                selected_device = devices.find(|device| {
                    device
                        .name()
                        .map(|name| name == preferred_name)
                        .unwrap_or(false)
                });

                if selected_device.is_none() {
                    warn!(
                        "preferred output device '{}' not found, falling back",
                        preferred_name
                    );
                }
            }
            Err(e) => {
                warn!("failed to list output devices while resolving preference: {e}");
            }
        }
    }

    let device = if let Some(device) = selected_device {
        device
    } else if let Some(default) = host.default_output_device() {
        default
    } else {
        let mut devices = host
            .output_devices()
            .map_err(|e| MorseError::AudioDevice(e.to_string()))?;
        let fallback = devices.next().ok_or(MorseError::NoOutputDevice)?;
        warn!("no default output device, falling back to first available output");
        fallback
    };

    info!(
        device = device.name().unwrap_or_default().as_str(),
        "opening output device"
    );

    let supported = device
        .default_output_config()
        .map_err(|e| MorseError::AudioDevice(e.to_string()))?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();

    info!(sample_rate, channels, ?sample_format, "output config selected");

    let error_flag = Arc::clone(&healthy);
    let on_error = move |err: cpal::StreamError| {
        error!("audio output stream error: {err}");
        error_flag.store(false, Ordering::Relaxed);
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _info| {
                write_frames(data, channels, &mut consumer, |s| s);
            },
            on_error,
            None,
        ),

        SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _info| {
                write_frames(data, channels, &mut consumer, sample_to_i16);
            },
            on_error,
            None,
        ),

        SampleFormat::U16 => device.build_output_stream(
            &config,
            move |data: &mut [u16], _info| {
                write_frames(data, channels, &mut consumer, sample_to_u16);
            },
            on_error,
            None,
        ),

        fmt => {
            return Err(MorseError::AudioStream(format!(
                "unsupported sample format: {fmt:?}"
            )))
        }
    }
    .map_err(|e| MorseError::AudioStream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| MorseError::AudioStream(e.to_string()))?;

    Ok((stream, sample_rate))
}

/// Fill interleaved output frames from the mono sample ring; silence when empty.
#[cfg(feature = "audio-cpal")]
fn write_frames<S: Copy>(
    data: &mut [S],
    channels: usize,
    consumer: &mut SampleConsumer,
    convert: impl Fn(f32) -> S,
) {
    for frame in data.chunks_mut(channels.max(1)) {
        let value = convert(consumer.try_pop().unwrap_or(0.0));
        frame.fill(value);
    }
}

#[cfg(feature = "audio-cpal")]
fn sample_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Unsigned formats centre silence at the midpoint.
#[cfg(feature = "audio-cpal")]
fn sample_to_u16(sample: f32) -> u16 {
    ((sample.clamp(-1.0, 1.0) + 1.0) * 0.5 * u16::MAX as f32) as u16
}

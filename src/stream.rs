//! CPAL duplex stream: capture, mix, playback.
//!
//! ```text
//! ┌──────────────┐  mono samples  ┌───────────────┐  pop ≤ C/period  ┌───────────────────┐
//! │ input stream │───────────────►│  rtrb (SPSC)  │─────────────────►│  output stream    │
//! │  (downmix)   │                └───────────────┘                  │  PeriodAdapter    │
//! └──────────────┘                                                   │  └─ MixEngine     │
//!                                                                    └───────────────────┘
//! ```
//!
//! The output callback owns the [`MixEngine`] and runs it once per period. It
//! never blocks on input: a short ring is read as silence. When either stream
//! reports an error the engine halts: the output callback stops running
//! periods and plays silence, and [`DuplexStream::check`] returns
//! [`LooperError::AudioBackend`]. Nothing is retried.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::config::EngineConfig;
use crate::device::CpalDevice;
use crate::engine::MixEngine;
use crate::error::{LooperError, LooperResult};
use crate::period::PeriodAdapter;

/// Captured periods allowed to queue up before the oldest are discarded.
/// Keeps input latency bounded when the two device clocks drift apart.
const MAX_BACKLOG_PERIODS: usize = 4;

/// Shared between the callbacks and the handle.
struct StreamStatus {
    halted: AtomicBool,
    failure: Mutex<Option<String>>,
    /// Periods that ran with less than a full period of input
    input_underruns: AtomicUsize,
    /// Captured samples dropped because the ring was full
    input_overruns: AtomicUsize,
}

impl StreamStatus {
    fn new() -> Self {
        Self {
            halted: AtomicBool::new(false),
            failure: Mutex::new(None),
            input_underruns: AtomicUsize::new(0),
            input_overruns: AtomicUsize::new(0),
        }
    }

    // Runs on cpal's error callback, never on the data callback.
    fn fail(&self, what: &str, err: cpal::StreamError) {
        tracing::error!("{} stream error: {}", what, err);
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if failure.is_none() {
            *failure = Some(format!("{} stream: {}", what, err));
        }
        self.halted.store(true, Ordering::Release);
    }

    fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    fn check(&self) -> LooperResult<()> {
        if !self.is_halted() {
            return Ok(());
        }
        let failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        Err(LooperError::AudioBackend(
            failure.clone().unwrap_or_else(|| "stream halted".into()),
        ))
    }
}

/// Running input and output streams driving one engine.
///
/// Audio stops when this is dropped.
pub struct DuplexStream {
    _input: Stream,
    _output: Stream,
    status: Arc<StreamStatus>,
    sample_rate: u32,
    input_channels: u16,
    output_channels: u16,
}

impl DuplexStream {
    /// Open both devices at `config.sample_rate`, hand `engine` to the output
    /// callback and start playing.
    ///
    /// Any failure to build or start a stream is a [`LooperError::AudioBackend`].
    pub fn start(
        input: &CpalDevice,
        output: &CpalDevice,
        engine: MixEngine,
        config: &EngineConfig,
    ) -> LooperResult<Self> {
        config.validate()?;
        let period = engine.period_size();

        let input_config = input.stream_config(config.sample_rate, period);
        let output_config = output.stream_config(config.sample_rate, period);

        let ring_size = (period * MAX_BACKLOG_PERIODS * 4).next_power_of_two().max(4096);
        let (producer, consumer) = RingBuffer::<f32>::new(ring_size);

        let status = Arc::new(StreamStatus::new());

        let input_stream = match input.sample_format() {
            SampleFormat::F32 => build_input::<f32>(input, &input_config, producer, status.clone()),
            SampleFormat::I16 => build_input::<i16>(input, &input_config, producer, status.clone()),
            SampleFormat::U16 => build_input::<u16>(input, &input_config, producer, status.clone()),
            format => Err(LooperError::AudioBackend(format!(
                "unsupported input sample format {}",
                format
            ))),
        }?;

        let adapter = PeriodAdapter::new(engine);
        let output_stream = match output.sample_format() {
            SampleFormat::F32 => {
                build_output::<f32>(output, &output_config, adapter, consumer, status.clone())
            }
            SampleFormat::I16 => {
                build_output::<i16>(output, &output_config, adapter, consumer, status.clone())
            }
            SampleFormat::U16 => {
                build_output::<u16>(output, &output_config, adapter, consumer, status.clone())
            }
            format => Err(LooperError::AudioBackend(format!(
                "unsupported output sample format {}",
                format
            ))),
        }?;

        input_stream.play().map_err(|e| {
            LooperError::AudioBackend(format!("failed to start input stream: {}", e))
        })?;
        output_stream.play().map_err(|e| {
            LooperError::AudioBackend(format!("failed to start output stream: {}", e))
        })?;

        tracing::info!(
            input = input.name(),
            output = output.name(),
            sample_rate = config.sample_rate,
            period,
            "audio streams started"
        );

        Ok(Self {
            _input: input_stream,
            _output: output_stream,
            status,
            sample_rate: config.sample_rate,
            input_channels: input_config.channels,
            output_channels: output_config.channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn input_channels(&self) -> u16 {
        self.input_channels
    }

    pub fn output_channels(&self) -> u16 {
        self.output_channels
    }

    /// True once a stream has failed; the engine no longer runs periods.
    pub fn is_halted(&self) -> bool {
        self.status.is_halted()
    }

    /// `Err(AudioBackend)` describing the first stream failure, if any.
    pub fn check(&self) -> LooperResult<()> {
        self.status.check()
    }

    /// Periods that were run with less than a full period of captured input.
    pub fn input_underruns(&self) -> usize {
        self.status.input_underruns.load(Ordering::Relaxed)
    }

    /// Captured samples dropped because the capture ring was full.
    pub fn input_overruns(&self) -> usize {
        self.status.input_overruns.load(Ordering::Relaxed)
    }
}

/// Downmix interleaved `data` to mono and queue it for the output callback.
///
/// A trailing partial frame is averaged over the channels it actually has.
fn push_downmixed<T>(
    data: &[T],
    channels: usize,
    producer: &mut Producer<f32>,
    status: &StreamStatus,
) where
    T: SizedSample,
    f32: FromSample<T>,
{
    for frame in data.chunks(channels) {
        let mono = frame.iter().map(|&s| f32::from_sample(s)).sum::<f32>() / frame.len() as f32;
        if producer.push(mono).is_err() {
            status.input_overruns.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn build_input<T>(
    device: &CpalDevice,
    config: &StreamConfig,
    mut producer: Producer<f32>,
    status: Arc<StreamStatus>,
) -> LooperResult<Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = (config.channels as usize).max(1);
    let err_status = status.clone();

    device
        .device()
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                push_downmixed(data, channels, &mut producer, &status);
            },
            move |err| err_status.fail("input", err),
            None,
        )
        .map_err(|e| LooperError::AudioBackend(format!("failed to build input stream: {}", e)))
}

/// Everything the output callback owns: the engine, the capture ring and scratch space.
struct OutputRenderer {
    adapter: PeriodAdapter,
    consumer: Consumer<f32>,
    status: Arc<StreamStatus>,
    mono: Box<[f32]>,
    channels: usize,
    max_backlog: usize,
}

impl OutputRenderer {
    fn new(
        adapter: PeriodAdapter,
        consumer: Consumer<f32>,
        status: Arc<StreamStatus>,
        channels: usize,
    ) -> Self {
        let period = adapter.engine().period_size();
        Self {
            adapter,
            consumer,
            status,
            mono: vec![0.0; period].into_boxed_slice(),
            channels: channels.max(1),
            max_backlog: period * MAX_BACKLOG_PERIODS,
        }
    }

    /// Fill one interleaved device buffer. Plays silence once the stream has halted.
    fn render<T>(&mut self, data: &mut [T])
    where
        T: SizedSample + FromSample<f32>,
    {
        if self.status.is_halted() {
            data.fill(T::EQUILIBRIUM);
            return;
        }

        let Self {
            adapter,
            consumer,
            status,
            mono,
            channels,
            max_backlog,
        } = self;
        let channels = *channels;
        let max_backlog = *max_backlog;
        let period = mono.len();

        for chunk in data.chunks_mut(period * channels) {
            let frames = (chunk.len() + channels - 1) / channels;

            adapter.fill(&mut mono[..frames], |input| {
                // Drop the oldest input when the ring has fallen behind
                let backlog = consumer.slots();
                if backlog > max_backlog {
                    if let Ok(stale) = consumer.read_chunk(backlog - max_backlog) {
                        stale.commit_all();
                    }
                }

                let mut n = 0;
                while n < input.len() {
                    match consumer.pop() {
                        Ok(sample) => input[n] = sample,
                        Err(_) => break,
                    }
                    n += 1;
                }
                if n < input.len() {
                    status.input_underruns.fetch_add(1, Ordering::Relaxed);
                }
                n
            });

            // Mono mix fans out to every output channel
            for (frame, &sample) in chunk.chunks_mut(channels).zip(mono.iter()) {
                frame.fill(T::from_sample(sample));
            }
        }
    }
}

fn build_output<T>(
    device: &CpalDevice,
    config: &StreamConfig,
    adapter: PeriodAdapter,
    consumer: Consumer<f32>,
    status: Arc<StreamStatus>,
) -> LooperResult<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let err_status = status.clone();
    let mut renderer = OutputRenderer::new(adapter, consumer, status, config.channels as usize);

    device
        .device()
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| renderer.render(data),
            move |err| err_status.fail("output", err),
            None,
        )
        .map_err(|e| LooperError::AudioBackend(format!("failed to build output stream: {}", e)))
}

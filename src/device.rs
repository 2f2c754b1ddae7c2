//! CPAL device discovery.
//!
//! [`CpalDevice`] wraps one input or output device together with its default
//! stream configuration. Pass an input and an output device to
//! [`DuplexStream::start`](crate::DuplexStream::start) to run the engine.
//!
//! # Example: List Devices
//!
//! ```no_run
//! use eddy::CpalDevice;
//!
//! for device in CpalDevice::list_inputs() {
//!     println!("in:  {} ({} Hz, {} ch)", device.name(), device.sample_rate(), device.channels());
//! }
//! for device in CpalDevice::list_outputs() {
//!     println!("out: {} ({} Hz, {} ch)", device.name(), device.sample_rate(), device.channels());
//! }
//! ```

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SupportedBufferSize, SupportedStreamConfig};

use crate::error::{LooperError, LooperResult};

/// Which way audio flows through a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// A discovered audio device and its default configuration.
pub struct CpalDevice {
    device: cpal::Device,
    config: SupportedStreamConfig,
    direction: Direction,

    name: String,
    sample_rate: u32,
    channels: u16,
}

impl CpalDevice {
    fn from_device(device: cpal::Device, direction: Direction) -> Option<Self> {
        let config = match direction {
            Direction::Input => device.default_input_config().ok()?,
            Direction::Output => device.default_output_config().ok()?,
        };
        let name = device.name().unwrap_or_else(|_| "Unknown".into());

        Some(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
            config,
            direction,
        })
    }

    fn default_for(direction: Direction) -> LooperResult<Self> {
        let host = cpal::default_host();
        let device = match direction {
            Direction::Input => host.default_input_device(),
            Direction::Output => host.default_output_device(),
        }
        .ok_or(LooperError::NoDevice(direction.label()))?;

        Self::from_device(device, direction).ok_or(LooperError::NoDevice(direction.label()))
    }

    fn list(direction: Direction) -> Vec<Self> {
        let host = cpal::default_host();
        match direction {
            Direction::Input => host
                .input_devices()
                .map(|devices| devices.filter_map(|d| Self::from_device(d, direction)).collect())
                .unwrap_or_default(),
            Direction::Output => host
                .output_devices()
                .map(|devices| devices.filter_map(|d| Self::from_device(d, direction)).collect())
                .unwrap_or_default(),
        }
    }

    fn find(direction: Direction, name: &str) -> LooperResult<Self> {
        Self::list(direction)
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| LooperError::DeviceNotFound(name.to_string()))
    }

    /// The system's default capture device.
    pub fn default_input() -> LooperResult<Self> {
        Self::default_for(Direction::Input)
    }

    /// The system's default playback device.
    pub fn default_output() -> LooperResult<Self> {
        Self::default_for(Direction::Output)
    }

    /// All capture devices. Empty if enumeration fails.
    pub fn list_inputs() -> Vec<Self> {
        Self::list(Direction::Input)
    }

    /// All playback devices. Empty if enumeration fails.
    pub fn list_outputs() -> Vec<Self> {
        Self::list(Direction::Output)
    }

    /// Capture device with exactly this name.
    pub fn find_input(name: &str) -> LooperResult<Self> {
        Self::find(Direction::Input, name)
    }

    /// Playback device with exactly this name.
    pub fn find_output(name: &str) -> LooperResult<Self> {
        Self::find(Direction::Output, name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device's default sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn device(&self) -> &cpal::Device {
        &self.device
    }

    pub(crate) fn sample_format(&self) -> SampleFormat {
        self.config.sample_format()
    }

    /// Stream configuration at `sample_rate`, asking for `period` frames per
    /// callback when the device advertises that size.
    pub(crate) fn stream_config(&self, sample_rate: u32, period: usize) -> cpal::StreamConfig {
        let buffer_size = match self.config.buffer_size() {
            SupportedBufferSize::Range { min, max } if (*min..=*max).contains(&(period as u32)) => {
                cpal::BufferSize::Fixed(period as u32)
            }
            _ => {
                tracing::warn!(
                    device = %self.name,
                    period,
                    "device does not advertise the period size, using its default buffer size"
                );
                cpal::BufferSize::Default
            }
        };

        if sample_rate != self.sample_rate {
            tracing::warn!(
                device = %self.name,
                requested = sample_rate,
                default = self.sample_rate,
                "requesting a non-default sample rate"
            );
        }

        cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size,
        }
    }
}

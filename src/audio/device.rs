//! Audio device enumeration and stream configuration

use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};

use super::error::{AudioError, AudioResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// Output settings. Sample rate always follows the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name, or the system default when unset
    pub device: Option<String>,
    /// Frames per callback, or the host default when unset
    pub buffer_size: Option<u32>,
}

/// Every named output device on the default host, flagging the default one.
pub fn list_output_devices() -> AudioResult<Vec<AudioDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    Ok(output_devices(&host)?
        .filter_map(|device| device.name().ok())
        .map(|name| AudioDeviceInfo {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
        })
        .collect())
}

/// Open the output device called `name`, or the host default when `None`.
pub fn open_output_device(name: Option<&str>) -> AudioResult<cpal::Device> {
    let host = cpal::default_host();
    let Some(wanted) = name else {
        return host.default_output_device().ok_or(AudioError::NoOutputDevice);
    };

    output_devices(&host)?
        .find(|device| device.name().map_or(false, |n| n == wanted))
        .ok_or_else(|| AudioError::DeviceNotFound(wanted.to_string()))
}

fn output_devices(host: &cpal::Host) -> AudioResult<impl Iterator<Item = cpal::Device>> {
    host.output_devices()
        .map_err(|e| AudioError::DeviceQuery(format!("failed to enumerate devices: {}", e)))
}

/// Stereo f32 stream config at the device's native sample rate.
///
/// Devices with a single channel get a mono stream; the mixer folds
/// left and right together for them.
pub fn native_stereo_config(
    device: &cpal::Device,
    preferred: &AudioConfig,
) -> AudioResult<cpal::StreamConfig> {
    let default_config = device
        .default_output_config()
        .map_err(|e| AudioError::DeviceQuery(format!("failed to get default config: {}", e)))?;

    let buffer_size = match preferred.buffer_size {
        Some(frames) => cpal::BufferSize::Fixed(frames),
        None => cpal::BufferSize::Default,
    };

    Ok(stream_config_for(
        default_config.channels(),
        default_config.sample_rate().0,
        buffer_size,
    ))
}

fn stream_config_for(
    device_channels: u16,
    sample_rate: u32,
    buffer_size: cpal::BufferSize,
) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels: device_channels.clamp(1, 2),
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config_is_stereo_at_native_rate() {
        let config = stream_config_for(8, 48_000, cpal::BufferSize::Default);
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_rate.0, 48_000);

        let mono = stream_config_for(1, 22_050, cpal::BufferSize::Fixed(256));
        assert_eq!(mono.channels, 1);
        assert_eq!(mono.buffer_size, cpal::BufferSize::Fixed(256));
    }

    #[test]
    fn test_audio_config_defaults_from_partial_json() {
        let config: AudioConfig = serde_json::from_str(r#"{"buffer_size": 512}"#).unwrap();
        assert_eq!(config.device, None);
        assert_eq!(config.buffer_size, Some(512));
    }
}

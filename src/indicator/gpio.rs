//! Raspberry Pi GPIO backing for the indicator lines

use super::{IndicatorDriver, OutputLine};
use crate::error::IndicatorError;
use rppal::gpio::{Gpio, Level, OutputPin};
use std::time::Duration;
use tracing::info;

impl OutputLine for OutputPin {
    fn set_level(&mut self, high: bool) {
        self.write(if high { Level::High } else { Level::Low });
    }
}

/// Claims both BCM pins as outputs, starting low.
pub fn open_driver(
    on_air_pin: u8,
    on_camera_pin: u8,
    blink_period: Duration,
) -> Result<IndicatorDriver<OutputPin>, IndicatorError> {
    let gpio = Gpio::new().map_err(|source| IndicatorError::Gpio {
        pin: on_air_pin,
        source,
    })?;

    let claim = |pin: u8| -> Result<OutputPin, IndicatorError> {
        gpio.get(pin)
            .map(|p| p.into_output_low())
            .map_err(|source| IndicatorError::Gpio { pin, source })
    };

    let on_air = claim(on_air_pin)?;
    let on_camera = claim(on_camera_pin)?;
    info!(
        "Indicator lines ready: on-air=BCM{}, on-camera=BCM{}",
        on_air_pin, on_camera_pin
    );

    Ok(IndicatorDriver::new(on_air, on_camera, blink_period))
}

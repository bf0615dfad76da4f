use log::info;

use crate::{
    config::CalibrationConfig,
    error::CalibrationError,
    traits::{Clock, SampleSource},
    types::Thresholds,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub baseline: f32,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone)]
pub struct Calibrator {
    config: CalibrationConfig,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    pub fn calibrate(
        &self,
        source: &mut dyn SampleSource,
        clock: &mut dyn Clock,
    ) -> Result<Calibration, CalibrationError> {
        if self.config.samples == 0 {
            return Err(CalibrationError::NoSamples);
        }

        info!("calibrating sensor ({} samples)", self.config.samples);
        let mut sum = 0.0_f64;
        for _ in 0..self.config.samples {
            sum += f64::from(source.read_raw());
            clock.sleep_ms(self.config.sample_interval_ms);
        }
        let baseline = (sum / f64::from(self.config.samples)) as f32;

        let calibration = self.derive(baseline)?;
        info!(
            "calibration complete: clean air {:.2}, warning {:.2}, emergency {:.2}",
            baseline,
            calibration.thresholds.warning_level(),
            calibration.thresholds.emergency_threshold()
        );
        Ok(calibration)
    }

    pub fn derive(&self, baseline: f32) -> Result<Calibration, CalibrationError> {
        if let Some(minimum) = self.config.min_baseline {
            if baseline < minimum {
                return Err(CalibrationError::BelowMinimum { baseline, minimum });
            }
        }

        let thresholds = Thresholds::new(
            baseline * self.config.warning_factor,
            baseline * self.config.emergency_factor,
        )
        .map_err(|source| CalibrationError::DegenerateBaseline { baseline, source })?;

        Ok(Calibration {
            baseline,
            thresholds,
        })
    }
}

use crate::types::{AlertState, SampleReading, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub next: AlertState,
    pub transitioned: bool,
}

impl Classification {
    fn stay(previous: AlertState) -> Self {
        Self {
            next: previous,
            transitioned: false,
        }
    }

    fn enter(next: AlertState) -> Self {
        Self {
            next,
            transitioned: true,
        }
    }
}

// A value equal to a boundary stays in the lower state.
pub fn classify(
    sample: &SampleReading,
    thresholds: &Thresholds,
    previous: AlertState,
) -> Classification {
    let raw = sample.raw;
    let warning = thresholds.warning_level();
    let emergency = thresholds.emergency_threshold();

    if raw > emergency && previous != AlertState::Emergency {
        return Classification::enter(AlertState::Emergency);
    }

    if raw > warning && raw <= emergency && !previous.is_alarm() {
        return Classification::enter(AlertState::Warning);
    }

    if raw <= warning && previous.is_alarm() {
        return Classification::enter(AlertState::Normal);
    }

    Classification::stay(previous)
}

#[derive(Debug, Clone, Default)]
pub struct AlertClassifier {
    thresholds: Thresholds,
    state: AlertState,
}

impl AlertClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: AlertState::Normal,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn evaluate(&mut self, sample: &SampleReading) -> Classification {
        let classification = classify(sample, &self.thresholds, self.state);
        self.state = classification.next;
        classification
    }

    pub(crate) fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }
}

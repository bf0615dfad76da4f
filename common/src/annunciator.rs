use crate::types::AlertState;

pub const EMERGENCY_BLINK_MS: u64 = 200;
pub const WARNING_BLINK_MS: u64 = 500;
pub const NORMAL_BLINK_MS: u64 = 2_000;

const EMERGENCY_BURST_CYCLES: u32 = 10;
const EMERGENCY_BURST_HALF_PERIOD_MS: u64 = 200;
const WARNING_BURST_CYCLES: u32 = 5;
const WARNING_BURST_HALF_PERIOD_MS: u64 = 500;

pub const ALARM_TONE_HZ: u32 = 1_000;
pub const STARTUP_TONE_HZ: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorAction {
    StatusLed(bool),
    ToggleStatusLed,
    AlertLed(bool),
    Buzzer(bool),
    Tone(u32),
    Silence,
    Delay(u64),
}

#[derive(Debug, Clone, Default)]
pub struct Annunciator {
    last_toggle_ms: Option<u64>,
}

impl Annunciator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blink_interval_ms(state: AlertState) -> u64 {
        match state {
            AlertState::Emergency => EMERGENCY_BLINK_MS,
            AlertState::Warning => WARNING_BLINK_MS,
            AlertState::Normal => NORMAL_BLINK_MS,
        }
    }

    pub fn on_transition(&self, next: AlertState) -> Vec<IndicatorAction> {
        match next {
            AlertState::Emergency => {
                let mut actions = burst(EMERGENCY_BURST_CYCLES, EMERGENCY_BURST_HALF_PERIOD_MS);
                actions.push(IndicatorAction::AlertLed(true));
                actions.push(IndicatorAction::Tone(ALARM_TONE_HZ));
                actions
            }
            AlertState::Warning => burst(WARNING_BURST_CYCLES, WARNING_BURST_HALF_PERIOD_MS),
            AlertState::Normal => vec![
                IndicatorAction::Buzzer(false),
                IndicatorAction::AlertLed(false),
                IndicatorAction::Silence,
            ],
        }
    }

    pub fn update(&mut self, state: AlertState, now_ms: u64) -> Vec<IndicatorAction> {
        self.blink(Self::blink_interval_ms(state), now_ms)
    }

    pub fn blink(&mut self, interval_ms: u64, now_ms: u64) -> Vec<IndicatorAction> {
        let due = self
            .last_toggle_ms
            .map(|last| now_ms.saturating_sub(last) > interval_ms)
            .unwrap_or(true);
        if !due {
            return Vec::new();
        }
        self.last_toggle_ms = Some(now_ms);
        vec![IndicatorAction::ToggleStatusLed]
    }

    pub fn startup_sequence() -> Vec<IndicatorAction> {
        let mut actions = Vec::with_capacity(18);
        for _ in 0..3 {
            actions.extend([
                IndicatorAction::StatusLed(true),
                IndicatorAction::AlertLed(true),
                IndicatorAction::Tone(STARTUP_TONE_HZ),
                IndicatorAction::Delay(200),
                IndicatorAction::StatusLed(false),
                IndicatorAction::AlertLed(false),
                IndicatorAction::Silence,
                IndicatorAction::Delay(200),
            ]);
        }
        actions
    }

    pub fn heartbeat(interval_ms: u64) -> Vec<IndicatorAction> {
        vec![
            IndicatorAction::ToggleStatusLed,
            IndicatorAction::Delay(interval_ms),
        ]
    }

    pub fn access_point_ready() -> Vec<IndicatorAction> {
        both_leds(5)
    }

    pub fn error_blink(times: u32) -> Vec<IndicatorAction> {
        both_leds(times)
    }
}

fn burst(cycles: u32, half_period_ms: u64) -> Vec<IndicatorAction> {
    let mut actions = Vec::with_capacity(cycles as usize * 6 + 2);
    for _ in 0..cycles {
        actions.extend([
            IndicatorAction::AlertLed(true),
            IndicatorAction::Buzzer(true),
            IndicatorAction::Delay(half_period_ms),
            IndicatorAction::AlertLed(false),
            IndicatorAction::Buzzer(false),
            IndicatorAction::Delay(half_period_ms),
        ]);
    }
    actions
}

fn both_leds(times: u32) -> Vec<IndicatorAction> {
    let mut actions = Vec::with_capacity(times as usize * 6);
    for _ in 0..times {
        actions.extend([
            IndicatorAction::StatusLed(true),
            IndicatorAction::AlertLed(true),
            IndicatorAction::Delay(200),
            IndicatorAction::StatusLed(false),
            IndicatorAction::AlertLed(false),
            IndicatorAction::Delay(200),
        ]);
    }
    actions
}

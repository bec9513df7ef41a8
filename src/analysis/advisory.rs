//! The advisory rule tree.
//!
//! Turns one cycle's raw reading, the recent trends, and the readiness
//! projection into a single composed message, per-category alert levels,
//! and actuator directives.
//!
//! Message composition follows a strict priority law:
//! - priority 1 (override) replaces whatever is there and is never
//!   downgraded for the rest of the cycle;
//! - priority 2 (additive) messages append to each other and replace the
//!   priority 3 default;
//! - priority 3 is the default and yields to anything.
//!
//! Temperature is evaluated before moisture, so the temperature verdict
//! establishes the priority the moisture rules react to.

use serde::{Deserialize, Serialize};

use crate::config::MonitorConfig;
use crate::db::models::{Reading, ScrapState};

use super::trend::Trend;

/// Severity tier attached to each indicator category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Ok,
    Info,
    Warning,
    Danger,
}

impl AlertLevel {
    /// Dashboard class string; the UI contract predates this crate.
    pub fn as_css(&self) -> &'static str {
        match self {
            Self::Ok => "alert alert-success",
            Self::Info => "alert alert-info",
            Self::Warning => "alert alert-warning",
            Self::Danger => "alert alert-danger",
        }
    }
}

/// Ambient temperature classified against the cold threshold at
/// acquisition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbientBand {
    Low,
    High,
}

/// Advisory rank. Lower number wins; see the module doc for the
/// override/append/replace law.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Override,
    Additive,
    Default,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Self::Override => 1,
            Self::Additive => 2,
            Self::Default => 3,
        }
    }
}

/// Temperature message catalog, addressed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempMessage {
    OptimalLevels,
    ReadyForNewLayer,
    CuringStage,
    UnsafeHot,
    UnhealthyHot,
    WarmNotCooling,
    WarmCooling,
    OptimalTemperature,
    CoolWarming,
    CoolFalling,
    CoolFallingColdAmbient,
}

impl TempMessage {
    pub fn text(self) -> &'static str {
        match self {
            Self::OptimalLevels => "Your compost is at optimal levels.",
            Self::ReadyForNewLayer => {
                "Your compost is ready for use. At your convenience, move your sensors to a new compost pile/layer."
            }
            Self::CuringStage => {
                "Your compost heating cycle is complete and is in a 'curing stage'."
            }
            Self::UnsafeHot => {
                "Your compost has reached an unsafe temperature. Immediately turn the compost and add water."
            }
            Self::UnhealthyHot => {
                "Your compost has reached unhealthily temperature. At your convenience, turn compost and add 'brown' (Carbon-rich) materials."
            }
            Self::WarmNotCooling => {
                "Your compost temperature is slightly higher than optimal. You may want to turn the compost and add 'brown' materials."
            }
            Self::WarmCooling => {
                "Your compost temperature is slightly higher than optimal, but is staring to cool off. I will let you know if any action is required."
            }
            Self::OptimalTemperature => "Your compost is at optimal temperature.",
            Self::CoolWarming => {
                "Your compost temperature is lower than optimal, but is staring to warm up. I will let you know if any action is required."
            }
            Self::CoolFalling => {
                "Your compost temperature is lower than optimal, and is continuing to cool. At your convenience, turn compost and add 'green' (Nitrogen-rich) materials."
            }
            Self::CoolFallingColdAmbient => {
                "Your compost temperature is lower than optimal, and is continuing to cool. The ambient temperature is low, so you should cover your compost to continue aerobic composting."
            }
        }
    }
}

/// Moisture message catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoistureMessage {
    TooWet,
    TooWetDrying,
    OptimalMoisture,
    DryRecovering,
    TooDry,
}

impl MoistureMessage {
    pub fn text(self) -> &'static str {
        match self {
            Self::TooWet => {
                "Your compost moisture is too wet. Turn your compost and add 'green' (Nitrogen-rich) materials."
            }
            Self::TooWetDrying => {
                "Your compost moisture content is too wet but is starting to dry out. I will let you know if any action is required."
            }
            Self::OptimalMoisture => "Your compost is at optimal moisture levels.",
            Self::DryRecovering => {
                "Your compost moisture content is too dry, but is starting to reach optimal moisture. I will let you know if any action is required."
            }
            Self::TooDry => {
                "Your compost is too dry and requires your attention. You need to turn and water your compost."
            }
        }
    }
}

/// One category's contribution to the composed advisory: its rank, text,
/// and the actuator changes that ride along when the text lands.
struct Verdict {
    priority: Priority,
    text: &'static str,
    vent: Option<u8>,
    water: Option<u8>,
}

/// The message/priority/actuator accumulator threaded through the
/// temperature-then-moisture evaluation.
#[derive(Debug)]
struct Advice {
    message: String,
    priority: Priority,
    vent_angle: u8,
    need_water: u8,
}

impl Advice {
    fn new() -> Self {
        Self {
            message: TempMessage::OptimalLevels.text().to_string(),
            priority: Priority::Default,
            vent_angle: 0,
            need_water: 0,
        }
    }

    /// Fold one category verdict into the accumulator per the priority
    /// law. Actuator changes only take effect when the verdict's text
    /// lands; an already-established override swallows everything.
    fn apply(&mut self, verdict: Verdict) {
        use Priority::*;

        let landed = match (verdict.priority, self.priority) {
            (Override, Additive | Default) => {
                self.message = verdict.text.to_string();
                self.priority = Override;
                true
            }
            (Additive, Additive) => {
                self.message.push(' ');
                self.message.push_str(verdict.text);
                true
            }
            (Additive, Default) => {
                self.message = verdict.text.to_string();
                self.priority = Additive;
                true
            }
            (Default, Default) => {
                self.message = verdict.text.to_string();
                true
            }
            _ => false,
        };

        if landed {
            if let Some(vent) = verdict.vent {
                self.vent_angle = vent;
            }
            if let Some(water) = verdict.water {
                self.need_water = water;
            }
        }
    }
}

/// Everything one advisory cycle produces: the composed message, the
/// per-category alert levels, and the actuator directives. Recomputed
/// every cycle; only the latest instance is exposed externally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryResult {
    pub message: String,
    pub priority: u8,
    pub temp_alert: AlertLevel,
    pub moist_alert: AlertLevel,
    pub methane_alert: AlertLevel,
    pub water_alert: AlertLevel,
    pub scrap_alert: AlertLevel,
    pub vent_angle: u8,
    pub need_water: u8,
    pub days_elapsed: i64,
    pub water_level_text: String,
    pub scrap_level_text: String,
}

/// Run the full rule tree for one cycle.
pub fn evaluate(
    reading: &Reading,
    ambient: AmbientBand,
    trend: Trend,
    days_elapsed: i64,
    scrap: &ScrapState,
    config: &MonitorConfig,
) -> AdvisoryResult {
    // Independent indicators first; none of these touch the composed
    // message or its priority.
    let (scrap_alert, scrap_level_text) = classify_scrap(scrap.last_scrap_level, config);
    let (water_alert, water_level_text) = classify_water(reading.water_level);
    let methane_alert = classify_methane(reading.methane, config);

    let mut temp_alert = AlertLevel::Info;
    let mut moist_alert = AlertLevel::Info;
    let mut advice = Advice::new();

    if days_elapsed >= config.ready_days {
        advice.message = TempMessage::ReadyForNewLayer.text().to_string();
    } else if days_elapsed >= config.safe_temp_days {
        advice.message = TempMessage::CuringStage.text().to_string();
    } else {
        temp_alert = evaluate_temperature(reading, ambient, trend, config, &mut advice);
        moist_alert = evaluate_moisture(reading, trend, config, &mut advice);
    }

    AdvisoryResult {
        message: advice.message,
        priority: advice.priority.rank(),
        temp_alert,
        moist_alert,
        methane_alert,
        water_alert,
        scrap_alert,
        vent_angle: advice.vent_angle,
        need_water: advice.need_water,
        days_elapsed,
        water_level_text,
        scrap_level_text,
    }
}

/// Mutually exclusive temperature bands, checked hottest first.
fn evaluate_temperature(
    reading: &Reading,
    ambient: AmbientBand,
    trend: Trend,
    config: &MonitorConfig,
    advice: &mut Advice,
) -> AlertLevel {
    let temp_f = reading.temp_f;

    if temp_f > config.temp_danger_f {
        advice.apply(Verdict {
            priority: Priority::Override,
            text: TempMessage::UnsafeHot.text(),
            vent: Some(1),
            water: Some(1),
        });
        AlertLevel::Danger
    } else if temp_f > config.temp_high_f {
        advice.apply(Verdict {
            priority: Priority::Override,
            text: TempMessage::UnhealthyHot.text(),
            vent: Some(1),
            water: Some(1),
        });
        AlertLevel::Danger
    } else if temp_f > config.temp_ok_f {
        if trend.temp < 1.0 {
            // Warm and not yet cooling fast enough: open the vent.
            advice.apply(Verdict {
                priority: Priority::Additive,
                text: TempMessage::WarmNotCooling.text(),
                vent: Some(1),
                water: None,
            });
        } else {
            advice.apply(Verdict {
                priority: Priority::Additive,
                text: TempMessage::WarmCooling.text(),
                vent: None,
                water: None,
            });
        }
        AlertLevel::Warning
    } else if temp_f > config.temp_low_f {
        advice.apply(Verdict {
            priority: Priority::Default,
            text: TempMessage::OptimalTemperature.text(),
            vent: None,
            water: None,
        });
        AlertLevel::Ok
    } else if trend.temp > 0.0 {
        advice.apply(Verdict {
            priority: Priority::Additive,
            text: TempMessage::CoolWarming.text(),
            vent: Some(0),
            water: None,
        });
        AlertLevel::Warning
    } else if ambient == AmbientBand::Low {
        // Cold pile, cold weather: escalates past the moisture rules.
        advice.apply(Verdict {
            priority: Priority::Override,
            text: TempMessage::CoolFallingColdAmbient.text(),
            vent: Some(0),
            water: None,
        });
        AlertLevel::Danger
    } else {
        advice.apply(Verdict {
            priority: Priority::Additive,
            text: TempMessage::CoolFalling.text(),
            vent: Some(0),
            water: None,
        });
        AlertLevel::Warning
    }
}

/// Moisture rules; run after temperature so they compose against the
/// priority it established.
fn evaluate_moisture(
    reading: &Reading,
    trend: Trend,
    config: &MonitorConfig,
    advice: &mut Advice,
) -> AlertLevel {
    let moisture = reading.moisture;

    if moisture > config.moist_high {
        if trend.moisture >= 0.0 {
            advice.apply(Verdict {
                priority: Priority::Override,
                text: MoistureMessage::TooWet.text(),
                vent: Some(1),
                water: None,
            });
            AlertLevel::Danger
        } else {
            advice.apply(Verdict {
                priority: Priority::Additive,
                text: MoistureMessage::TooWetDrying.text(),
                vent: Some(1),
                water: None,
            });
            AlertLevel::Warning
        }
    } else if moisture > config.moist_low {
        AlertLevel::Ok
    } else if trend.moisture < 1.0 {
        advice.apply(Verdict {
            priority: Priority::Override,
            text: MoistureMessage::TooDry.text(),
            vent: Some(0),
            water: Some(1),
        });
        AlertLevel::Danger
    } else {
        advice.apply(Verdict {
            priority: Priority::Additive,
            text: MoistureMessage::DryRecovering.text(),
            vent: None,
            water: Some(1),
        });
        AlertLevel::Warning
    }
}

fn classify_scrap(level: i64, config: &MonitorConfig) -> (AlertLevel, String) {
    if level > config.scrap_high {
        (AlertLevel::Danger, "Please empty".to_string())
    } else if level > config.scrap_medium {
        (AlertLevel::Warning, "Empty soon".to_string())
    } else {
        (AlertLevel::Ok, "Ok".to_string())
    }
}

fn classify_water(water_level: i64) -> (AlertLevel, String) {
    if water_level <= 0 {
        (AlertLevel::Danger, "Refill".to_string())
    } else {
        (AlertLevel::Ok, "Ok".to_string())
    }
}

fn classify_methane(methane_ppm: f64, config: &MonitorConfig) -> AlertLevel {
    if methane_ppm > config.methane_danger_ppm {
        AlertLevel::Danger
    } else if methane_ppm > config.methane_warning_ppm {
        AlertLevel::Warning
    } else {
        AlertLevel::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MonitorConfig {
        MonitorConfig::default()
    }

    fn reading(temp_f: f64, moisture: f64) -> Reading {
        Reading {
            id: None,
            temp_f,
            temp_c: (temp_f - 32.0) * 5.0 / 9.0,
            ambient_temp_f: 70.0,
            ambient_temp_c: 21.1,
            moisture,
            methane: 500.0,
            water_level: 3,
            timestamp: 1_700_000_000,
        }
    }

    fn trend(temp: f64, moisture: f64) -> Trend {
        Trend { temp, moisture }
    }

    fn run(
        r: &Reading,
        ambient: AmbientBand,
        t: Trend,
        days: i64,
    ) -> AdvisoryResult {
        evaluate(r, ambient, t, days, &ScrapState::default(), &config())
    }

    #[test]
    fn ready_days_short_circuit_everything() {
        let r = reading(180.0, 70.0);
        let result = run(&r, AmbientBand::High, trend(5.0, 5.0), 35);
        assert_eq!(result.message, TempMessage::ReadyForNewLayer.text());
        assert_eq!(result.priority, 3);
        assert_eq!(result.vent_angle, 0);
        assert_eq!(result.need_water, 0);
        assert_eq!(result.temp_alert, AlertLevel::Info);
        assert_eq!(result.moist_alert, AlertLevel::Info);
    }

    #[test]
    fn curing_stage_between_safe_and_ready() {
        let r = reading(150.0, 50.0);
        let result = run(&r, AmbientBand::High, trend(0.0, 0.0), 28);
        assert_eq!(result.message, TempMessage::CuringStage.text());
        assert_eq!(result.priority, 3);
    }

    #[test]
    fn danger_heat_overrides_regardless_of_moisture() {
        // Wet pile with a rising moisture trend would normally override,
        // but temperature got to priority 1 first.
        let r = reading(180.0, 70.0);
        let result = run(&r, AmbientBand::High, trend(0.0, 1.0), 5);
        assert_eq!(result.message, TempMessage::UnsafeHot.text());
        assert_eq!(result.priority, 1);
        assert_eq!(result.vent_angle, 1);
        assert_eq!(result.need_water, 1);
        assert_eq!(result.temp_alert, AlertLevel::Danger);
        assert_eq!(result.moist_alert, AlertLevel::Danger);
    }

    #[test]
    fn high_band_is_a_distinct_danger_message() {
        let r = reading(170.0, 50.0);
        let result = run(&r, AmbientBand::High, trend(0.0, 0.0), 5);
        assert_eq!(result.message, TempMessage::UnhealthyHot.text());
        assert_eq!(result.priority, 1);
        assert_eq!(result.vent_angle, 1);
        assert_eq!(result.need_water, 1);
    }

    #[test]
    fn warm_band_with_wet_drying_moisture_appends() {
        // tempF=145 in the warm band, trend below 1: priority 2 with vent
        // open. Moisture over the high bar but drying: its priority 2 text
        // appends to the temperature text.
        let r = reading(145.0, 70.0);
        let result = run(&r, AmbientBand::High, trend(-1.0, -1.0), 5);
        let expected = format!(
            "{} {}",
            TempMessage::WarmNotCooling.text(),
            MoistureMessage::TooWetDrying.text()
        );
        assert_eq!(result.message, expected);
        assert_eq!(result.priority, 2);
        assert_eq!(result.vent_angle, 1);
        assert_eq!(result.temp_alert, AlertLevel::Warning);
        assert_eq!(result.moist_alert, AlertLevel::Warning);
    }

    #[test]
    fn warm_band_cooling_keeps_vent_closed() {
        let r = reading(145.0, 50.0);
        let result = run(&r, AmbientBand::High, trend(2.0, 0.0), 5);
        assert_eq!(result.message, TempMessage::WarmCooling.text());
        assert_eq!(result.priority, 2);
        assert_eq!(result.vent_angle, 0);
    }

    #[test]
    fn optimal_band_is_the_default_priority() {
        let r = reading(120.0, 50.0);
        let result = run(&r, AmbientBand::High, trend(0.0, 0.0), 5);
        assert_eq!(result.message, TempMessage::OptimalTemperature.text());
        assert_eq!(result.priority, 3);
        assert_eq!(result.temp_alert, AlertLevel::Ok);
        assert_eq!(result.moist_alert, AlertLevel::Ok);
    }

    #[test]
    fn wet_and_rising_overrides_a_priority_two_temperature() {
        let r = reading(145.0, 70.0);
        let result = run(&r, AmbientBand::High, trend(-1.0, 0.5), 5);
        assert_eq!(result.message, MoistureMessage::TooWet.text());
        assert_eq!(result.priority, 1);
        assert_eq!(result.vent_angle, 1);
        assert_eq!(result.moist_alert, AlertLevel::Danger);
    }

    #[test]
    fn wet_and_rising_replaces_the_optimal_default() {
        let r = reading(120.0, 70.0);
        let result = run(&r, AmbientBand::High, trend(0.0, 0.0), 5);
        assert_eq!(result.message, MoistureMessage::TooWet.text());
        assert_eq!(result.priority, 1);
        assert_eq!(result.vent_angle, 1);
    }

    #[test]
    fn dry_and_falling_overrides_and_requests_water() {
        let r = reading(145.0, 30.0);
        let result = run(&r, AmbientBand::High, trend(-1.0, 0.0), 5);
        assert_eq!(result.message, MoistureMessage::TooDry.text());
        assert_eq!(result.priority, 1);
        assert_eq!(result.vent_angle, 0);
        assert_eq!(result.need_water, 1);
        assert_eq!(result.moist_alert, AlertLevel::Danger);
    }

    #[test]
    fn dry_but_recovering_appends_and_requests_water() {
        let r = reading(145.0, 30.0);
        let result = run(&r, AmbientBand::High, trend(-1.0, 2.0), 5);
        let expected = format!(
            "{} {}",
            TempMessage::WarmNotCooling.text(),
            MoistureMessage::DryRecovering.text()
        );
        assert_eq!(result.message, expected);
        assert_eq!(result.priority, 2);
        assert_eq!(result.need_water, 1);
    }

    #[test]
    fn dry_recovering_replaces_the_optimal_default() {
        let r = reading(120.0, 30.0);
        let result = run(&r, AmbientBand::High, trend(0.0, 2.0), 5);
        assert_eq!(result.message, MoistureMessage::DryRecovering.text());
        assert_eq!(result.priority, 2);
        assert_eq!(result.need_water, 1);
    }

    #[test]
    fn cold_pile_cold_ambient_escalates_to_danger() {
        let r = reading(80.0, 50.0);
        let result = run(&r, AmbientBand::Low, trend(-1.0, 0.0), 5);
        assert_eq!(result.message, TempMessage::CoolFallingColdAmbient.text());
        assert_eq!(result.priority, 1);
        assert_eq!(result.temp_alert, AlertLevel::Danger);
    }

    #[test]
    fn cold_pile_warm_ambient_stays_a_warning() {
        let r = reading(80.0, 50.0);
        let result = run(&r, AmbientBand::High, trend(-1.0, 0.0), 5);
        assert_eq!(result.message, TempMessage::CoolFalling.text());
        assert_eq!(result.priority, 2);
        assert_eq!(result.temp_alert, AlertLevel::Warning);
    }

    #[test]
    fn cold_pile_but_warming_is_just_a_warning() {
        let r = reading(80.0, 50.0);
        let result = run(&r, AmbientBand::Low, trend(1.0, 0.0), 5);
        assert_eq!(result.message, TempMessage::CoolWarming.text());
        assert_eq!(result.priority, 2);
    }

    #[test]
    fn override_established_by_ambient_cold_blocks_moisture_override() {
        // Moisture would override a lower-priority message, but the
        // ambient-cold branch already set priority 1.
        let r = reading(80.0, 70.0);
        let result = run(&r, AmbientBand::Low, trend(-1.0, 1.0), 5);
        assert_eq!(result.message, TempMessage::CoolFallingColdAmbient.text());
        assert_eq!(result.priority, 1);
        // The moisture alert still reports its own severity.
        assert_eq!(result.moist_alert, AlertLevel::Danger);
        // And the swallowed verdict's actuator change did not land.
        assert_eq!(result.vent_angle, 0);
    }

    #[test]
    fn methane_tiers() {
        let mut r = reading(120.0, 50.0);
        r.methane = 60_000.0;
        assert_eq!(
            run(&r, AmbientBand::High, trend(0.0, 0.0), 5).methane_alert,
            AlertLevel::Danger
        );
        r.methane = 20_000.0;
        assert_eq!(
            run(&r, AmbientBand::High, trend(0.0, 0.0), 5).methane_alert,
            AlertLevel::Warning
        );
        r.methane = 500.0;
        assert_eq!(
            run(&r, AmbientBand::High, trend(0.0, 0.0), 5).methane_alert,
            AlertLevel::Ok
        );
    }

    #[test]
    fn empty_reservoir_demands_a_refill() {
        let mut r = reading(120.0, 50.0);
        r.water_level = 0;
        let result = run(&r, AmbientBand::High, trend(0.0, 0.0), 5);
        assert_eq!(result.water_alert, AlertLevel::Danger);
        assert_eq!(result.water_level_text, "Refill");
    }

    #[test]
    fn scrap_tiers() {
        let r = reading(120.0, 50.0);
        let cfg = config();
        let full = ScrapState {
            last_scrap_level: 25,
            total_scraps: 0.0,
        };
        let result = evaluate(&r, AmbientBand::High, trend(0.0, 0.0), 5, &full, &cfg);
        assert_eq!(result.scrap_alert, AlertLevel::Danger);
        assert_eq!(result.scrap_level_text, "Please empty");

        let filling = ScrapState {
            last_scrap_level: 15,
            total_scraps: 0.0,
        };
        let result = evaluate(&r, AmbientBand::High, trend(0.0, 0.0), 5, &filling, &cfg);
        assert_eq!(result.scrap_alert, AlertLevel::Warning);
        assert_eq!(result.scrap_level_text, "Empty soon");

        let result = evaluate(
            &r,
            AmbientBand::High,
            trend(0.0, 0.0),
            5,
            &ScrapState::default(),
            &cfg,
        );
        assert_eq!(result.scrap_alert, AlertLevel::Ok);
        assert_eq!(result.scrap_level_text, "Ok");
    }
}

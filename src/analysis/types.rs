use serde::{Deserialize, Serialize};

/// Structured audit returned by the analysis model.
///
/// The session stores and forwards this record; only presentation reads its
/// fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalAnalysis {
    pub sleep_score: SleepScore,
    pub pre_sync_status: PreSyncStatus,
    pub post_sync_projection: PostSyncProjection,
    pub bio_logic_impact: BioLogicImpact,
    pub wellness_forecast: Vec<WellnessForecastItem>,
    pub activity_suggestion: ActivitySuggestion,
    pub iot_concept: IotConcept,
    pub circadian_phase: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepScore {
    pub current: f64,
    pub optimized: f64,
    pub improvement: f64,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreSyncStatus {
    pub kelvin_range: String,
    pub intensity_description: String,
    pub lux_equivalent: String,
    pub stressors: Vec<String>,
    pub mismatch_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSyncProjection {
    pub ideal_kelvin: String,
    pub target_intensity: String,
    pub recovery_time: String,
    pub expected_improvement: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BioLogicImpact {
    pub impact_assessment: String,
    pub melatonin_reduction_range: String,
    pub sleep_delay_range: String,
    pub citation: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastStatus {
    #[default]
    Optimal,
    Caution,
    #[serde(rename = "Action Required")]
    ActionRequired,
}

impl ForecastStatus {
    pub fn label(self) -> &'static str {
        match self {
            ForecastStatus::Optimal => "Optimal",
            ForecastStatus::Caution => "Caution",
            ForecastStatus::ActionRequired => "Action Required",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellnessForecastItem {
    pub time: String,
    pub activity: String,
    pub status: ForecastStatus,
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySuggestion {
    pub location: String,
    pub coordinates: String,
    pub suggested_time: String,
    pub activity: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IotConcept {
    pub target: String,
    pub integration: String,
    pub protocol: String,
    pub status: String,
    pub command: MatterCommand,
}

/// Conceptual smart-home payload; keys are snake_case on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatterCommand {
    pub lighting: LightingCommand,
    pub environment: EnvironmentCommand,
    pub devices: DeviceCommand,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightingCommand {
    pub target_kelvin: f64,
    pub target_brightness: f64,
    pub transition_mode: String,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentCommand {
    pub suggested_temperature: String,
    pub air_quality_note: String,
    pub noise_reduction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub screens: String,
    pub smart_blinds: String,
    pub ambient_sound: String,
}

#[cfg(test)]
impl EnvironmentalAnalysis {
    pub(crate) fn sample(score: f64) -> Self {
        Self {
            sleep_score: SleepScore {
                current: score,
                optimized: 92.0,
                improvement: 92.0 - score,
                description: "Cool overhead LEDs dominate the frame.".into(),
            },
            circadian_phase: "Activation".into(),
            ..Self::default()
        }
    }
}

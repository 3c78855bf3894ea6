use serde_json::{json, Value};

/// System instruction sent with every audit request
pub fn system_instruction(reference_time: &str, is_live: bool) -> String {
    format!(
        "You are LUMINA OS, a bio-adaptive architectural intelligence engine.

MISSION: Audit physical spaces for biological alignment and circadian support.

VOCABULARY PROTOCOL (MANDATORY):
- Never use time-of-day terms such as \"morning\", \"evening\", \"night\" or \"noon\".
- Use biologically neutral terms instead, for example \"biologically activating light exposure\", \
\"alertness-promoting spectral flux\", \"melanopsin-safe dimming\" or \"restorative low-blue light\".
- Avoid medical jargon. Keep language simple, confident and beginner-friendly.

REASONING PROTOCOL:
1. SPATIAL ANALYSIS: Estimate spectral quality from the visible light sources and surface reflectivity.
2. CIRCADIAN GROUNDING:
   - If the source is LIVE (isLive: {is_live}), cross-reference spectral quality with Dubai GST [{reference_time}].
   - If the source is UPLOADED, ignore the clock and judge only the spectral quality of the captured frame.
3. DUBAI ECOSYSTEM: For outdoor suggestions name a specific Dubai location (Kite Beach, Creek Park, \
Al Qudra, JLT Park) to anchor the biological clock.
4. MATTER ACTUATION: Produce a conceptual Matter v1.3 payload that would move a smart home to the optimized state.

OUTPUT REQUIREMENTS:
- Tone: premium, futuristic, non-medical.
- Always include \"Analysis is based on visible light patterns. Educational estimate only.\" in descriptions."
    )
}

/// Per-request directive accompanying the image
pub fn directive(reference_time: &str, is_live: bool) -> String {
    let source = if is_live { "LIVE" } else { "UPLOAD" };
    format!(
        "EXECUTE_BIO_AUDIT: Source_{source}. Ref_Time: [{reference_time}]. \
Provide specific Dubai location for anchoring and a Matter v1.3 sync payload."
    )
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

fn strings(names: &[&str]) -> Value {
    let mut properties = serde_json::Map::new();
    for name in names {
        properties.insert((*name).to_string(), json!({ "type": "STRING" }));
    }
    object(Value::Object(properties), names)
}

/// Response schema matching `EnvironmentalAnalysis`
pub fn response_schema() -> Value {
    let number = json!({ "type": "NUMBER" });
    let string = json!({ "type": "STRING" });

    let sleep_score = object(
        json!({
            "current": number,
            "optimized": number,
            "improvement": number,
            "description": string,
        }),
        &["current", "optimized", "improvement", "description"],
    );

    let pre_sync_status = object(
        json!({
            "kelvinRange": string,
            "intensityDescription": string,
            "luxEquivalent": string,
            "stressors": { "type": "ARRAY", "items": string },
            "mismatchDescription": string,
        }),
        &["kelvinRange", "intensityDescription", "luxEquivalent", "stressors", "mismatchDescription"],
    );

    let forecast_item = object(
        json!({
            "time": string,
            "activity": string,
            "status": { "type": "STRING", "enum": ["Optimal", "Caution", "Action Required"] },
            "rationale": string,
        }),
        &["time", "activity", "status", "rationale"],
    );

    let command = object(
        json!({
            "lighting": object(
                json!({
                    "target_kelvin": number,
                    "target_brightness": number,
                    "transition_mode": string,
                    "duration_seconds": number,
                }),
                &["target_kelvin", "target_brightness", "transition_mode", "duration_seconds"],
            ),
            "environment": strings(&["suggested_temperature", "air_quality_note", "noise_reduction"]),
            "devices": strings(&["screens", "smart_blinds", "ambient_sound"]),
        }),
        &["lighting", "environment", "devices"],
    );

    let iot_concept = object(
        json!({
            "target": string,
            "integration": string,
            "protocol": string,
            "status": string,
            "command": command,
        }),
        &["target", "integration", "protocol", "status", "command"],
    );

    object(
        json!({
            "sleepScore": sleep_score,
            "preSyncStatus": pre_sync_status,
            "postSyncProjection": strings(&["idealKelvin", "targetIntensity", "recoveryTime", "expectedImprovement"]),
            "bioLogicImpact": strings(&["impactAssessment", "melatoninReductionRange", "sleepDelayRange", "citation"]),
            "wellnessForecast": { "type": "ARRAY", "items": forecast_item },
            "activitySuggestion": strings(&["location", "coordinates", "suggestedTime", "activity", "rationale"]),
            "iotConcept": iot_concept,
            "circadianPhase": string,
        }),
        &[
            "sleepScore",
            "preSyncStatus",
            "postSyncProjection",
            "bioLogicImpact",
            "wellnessForecast",
            "activitySuggestion",
            "iotConcept",
            "circadianPhase",
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_names_the_source() {
        assert!(directive("21:04:09", true).starts_with("EXECUTE_BIO_AUDIT: Source_LIVE. Ref_Time: [21:04:09]."));
        assert!(directive("21:04:09", false).contains("Source_UPLOAD"));
    }

    #[test]
    fn instruction_embeds_live_flag_and_time() {
        let text = system_instruction("07:30:00", false);
        assert!(text.contains("isLive: false"));
        assert!(text.contains("[07:30:00]"));
    }

    #[test]
    fn schema_requires_every_top_level_section() {
        let schema = response_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 8);
        assert_eq!(
            schema["properties"]["wellnessForecast"]["items"]["properties"]["status"]["enum"][2],
            "Action Required"
        );
        assert_eq!(
            schema["properties"]["iotConcept"]["properties"]["command"]["properties"]["devices"]["required"],
            json!(["screens", "smart_blinds", "ambient_sound"])
        );
    }
}

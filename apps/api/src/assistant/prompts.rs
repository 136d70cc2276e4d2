// Assistant LLM prompt templates.
// All prompts for log validation, hold reasons, CAR and client summaries live here.

use crate::llm_client::prompts::{FACTS_ONLY_INSTRUCTION, JSON_ONLY_SYSTEM};

pub const WORK_LOG_SYSTEM: &str = "\
You are a field-services supervisor reviewing solar plant technicians' work logs. \
Decide whether a log is complete enough for the client and for warranty records. \
Be practical: technicians write short notes from the field. \
Only ask about information that is genuinely missing and matters.";

pub const HOLD_REASON_SYSTEM: &str = "\
You are a field-services dispatcher reviewing why a technician put a work order on hold. \
A good hold reason lets another person pick the job up without calling the technician.";

pub const CAR_SYSTEM: &str = "\
You are a technical writer turning solar field technicians' notes into \
Cause-Action-Result reports for asset owners.";

pub const CLIENT_SUMMARY_SYSTEM: &str = "\
You explain field work to solar plant clients who are not technicians. \
Write in plain, calm language without jargon or markdown.";

/// Appends the JSON-only contract to a role prompt.
pub fn json_system(role: &str) -> String {
    format!("{role} {JSON_ONLY_SYSTEM}")
}

pub const WORK_LOG_VALIDATION_INSTRUCTIONS: &str = "\
A log is VALID when, for the work it claims, it states:
1. What equipment or area was worked on (inverter number, combiner box, string, block).
2. What the technician found or observed.
3. What the technician actually did.
4. The state the equipment was left in, or the next step if unresolved.
Apply the work-type and work-status guidelines above on top of these.
Answers given in the follow-up history count toward completeness.
If the log is INVALID, ask at most 2 short, specific follow-up questions, \
each about one missing item. Never repeat a question already answered.";

pub const HOLD_REASON_VALIDATION_INSTRUCTIONS: &str = "\
A hold reason is VALID when it states:
1. What is blocking the work.
2. What is needed to unblock it (part, permit, person, weather window).
3. Who owns the next step, or what has already been requested.
Answers given in the follow-up history count toward completeness.
If the hold reason is INVALID, ask at most 2 short, specific follow-up questions.";

pub const CAR_INSTRUCTIONS: &str = "\
Write three short paragraphs:
- cause: why the work was needed, from the work order description and the findings.
- action: what was done, in order, with the equipment identifiers the technician gave.
- result: the final state of the equipment and any follow-up still required.
Combine the earlier status logs with the final completion notes. \
Write in past tense, third person, without markdown.";

pub const CLIENT_SUMMARY_INSTRUCTIONS: &str = "\
Return:
- summary: two sentences a plant owner can read in ten seconds.
- notes: a short plain-language paragraph with any detail the client needs \
(what was found, what was done, whether anything is still outstanding).";

/// Work-log validation prompt. Filled with [`fill_template`].
pub const WORK_LOG_PROMPT_TEMPLATE: &str = r#"## WORK ORDER CONTEXT
Work order type: "{work_order_type}"
Work contribution for this log:
{contribution}
Cause of work: "{description}"
Plant: "{plant}"

## PREVIOUS LOGS FOR THIS WORK ORDER
{previous_logs}

## WORK ORDER TYPE GUIDELINES
{type_guidelines}

## WORK STATUS GUIDELINES
{status_guidelines}

## VALIDATION INSTRUCTIONS
{validation_instructions}

{facts_only}

## INITIAL TECHNICIAN LOG
{operational_log}

## FOLLOW-UP HISTORY
{conversation}

Return a JSON object with exactly this shape:
{
  "valid": true | false,
  "missing": "what is still missing, empty string when valid",
  "follow_up_questions": ["at most 2 questions, empty when valid"]
}"#;

/// Hold-reason validation prompt. Filled with [`fill_template`].
pub const HOLD_REASON_PROMPT_TEMPLATE: &str = r#"## WORK ORDER CONTEXT
Work order type: "{work_order_type}"
Cause of work: "{description}"
Plant: "{plant}"

## PREVIOUS LOGS FOR THIS WORK ORDER
{previous_logs}

## HOLD REASON REQUIREMENTS
{hold_requirements}

## VALIDATION INSTRUCTIONS
{validation_instructions}

## REASON FOR HOLD
{hold_reason}

## FOLLOW-UP HISTORY
{conversation}

Return a JSON object with exactly this shape:
{
  "valid": true | false,
  "missing": "what is still missing, empty string when valid",
  "follow_up_questions": ["at most 2 questions, empty when valid"],
  "hold_reason_analysis": "one or two sentences on what is blocking the job",
  "recommended_actions": "what should happen next to release the hold"
}"#;

/// CAR conversion prompt. Filled with [`fill_template`].
pub const CAR_PROMPT_TEMPLATE: &str = r#"Work order type: {work_order_type}
Cause of work: {description}
Plant: {plant}

## WORK STATUS | NOTES WITH TIME ALLOCATION
{previous_logs}

## INSTRUCTIONS
{instructions}

{facts_only}

## FINAL COMPLETION NOTES FROM THE TECHNICIAN
{completion_notes}

Return a JSON object with exactly this shape:
{
  "cause": "string",
  "action": "string",
  "result": "string"
}"#;

/// Client summary prompt. Filled with [`fill_template`].
pub const CLIENT_SUMMARY_PROMPT_TEMPLATE: &str = r#"## WORK ORDER CONTEXT
Work order type: "{work_order_type}"
Work contribution:
{contribution}
Cause of work: "{description}"
Plant: "{plant}"

## INSTRUCTIONS
{instructions}

{facts_only}

## CONVERSATION BETWEEN THE TECHNICIAN AND THE ASSISTANT
Person | message
{conversation}

Focus on the conversation above. Do not use markdown. Use simple, clear language.

Return a JSON object with exactly this shape:
{
  "summary": "string",
  "notes": "string"
}"#;

/// Fills `{name}` placeholders in a single pass over the template.
/// Inserted values are never rescanned, so technician text that happens to
/// contain `{plant}` reaches the model as written. Braces that do not name a
/// known key (the JSON shapes above) are copied through.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match hit {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn facts_only() -> &'static str {
    FACTS_ONLY_INSTRUCTION
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Completeness rules for one work status type.
pub fn work_status_guideline(status: &str) -> &'static str {
    match normalize(status).as_str() {
        "troubleshooting" => "Troubleshooting: name the symptom, the fault or alarm code if any, \
            the tests performed with readings, and the root cause found or ruled out.",
        "warranty_support" => "Warranty support: name the OEM, the equipment serial or position, \
            the case or RMA number if opened, and what the OEM asked the technician to do.",
        "work" => "Work: state the task performed, the equipment worked on, parts used or replaced, \
            and whether the equipment was returned to service.",
        "delay" => "Delay: state what caused the delay, how long it lasted, \
            and what was done while waiting.",
        "training" => "Training: state the topic, who delivered it, \
            and the equipment or procedure it covered.",
        "travel" => "Travel: state origin, destination, and the reason for the trip.",
        _ => "General: state what was done, on which equipment, and the outcome.",
    }
}

/// Completeness rules for one work order type.
pub fn work_order_type_guideline(wo_type: &str) -> &'static str {
    match normalize(wo_type).as_str() {
        "preventive" => "Preventive maintenance: confirm which checklist items were completed \
            and report any deficiency found, even if minor.",
        "corrective" => "Corrective work: the log must connect the reported failure to the \
            repair and confirm the equipment is producing again, or explain why not.",
        "ad_hoc" => "Ad hoc work: describe the request, who made it, and what was delivered.",
        "project" => "Project work: state the project scope item addressed and progress made.",
        "oem_repair_work" => "OEM repair: record OEM involvement, parts supplied by the OEM, \
            and any warranty paperwork.",
        _ => "No additional work order type rules.",
    }
}

/// What a complete explanation looks like for one hold reason category.
pub fn hold_reason_guideline(reason: &str) -> &'static str {
    match normalize(reason).as_str() {
        "parts" | "awaiting_parts" => "Parts: name the part and quantity, whether it was ordered, \
            the order or PO reference if known, and the expected delivery.",
        "weather" => "Weather: name the condition (lightning, high wind, flooding) \
            and when work can safely resume.",
        "access" | "site_access" => "Access: state what access is blocked (gate, key, permit, landowner) \
            and who has been contacted.",
        "safety" => "Safety: describe the hazard, whether the area was made safe, \
            and who must clear it before work resumes.",
        "customer" | "client" => "Customer: state what the customer needs to decide or provide \
            and who was contacted.",
        "oem_support" | "vendor" => "OEM support: name the OEM, the open case number if any, \
            and what the OEM must do next.",
        _ => "General hold: state what is blocking the work and what is needed to continue.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guideline_lookup_normalizes_names() {
        assert!(work_status_guideline("Warranty Support").starts_with("Warranty support"));
        assert!(work_status_guideline("warranty_support").starts_with("Warranty support"));
        assert!(work_order_type_guideline("Ad Hoc").starts_with("Ad hoc"));
        assert!(work_order_type_guideline("OEM Repair Work").starts_with("OEM repair"));
        assert!(hold_reason_guideline("Awaiting Parts").starts_with("Parts"));
    }

    #[test]
    fn test_unknown_names_fall_back() {
        assert!(work_status_guideline("Inspection").starts_with("General"));
        assert!(hold_reason_guideline("Other").starts_with("General hold"));
    }

    #[test]
    fn test_fill_template_does_not_rescan_values() {
        let filled = fill_template(
            "Log: {log}\nPlant: {plant}",
            &[("log", "switched to {plant} mode"), ("plant", "Sunfield")],
        );
        assert_eq!(filled, "Log: switched to {plant} mode\nPlant: Sunfield");
    }

    #[test]
    fn test_fill_template_keeps_unknown_braces() {
        let filled = fill_template("{\n  \"valid\": true\n} {missing} {x", &[("x", "y")]);
        assert_eq!(filled, "{\n  \"valid\": true\n} {missing} {x");
    }

    #[test]
    fn test_templates_keep_json_shape_after_filling() {
        let filled = fill_template(CAR_PROMPT_TEMPLATE, &[("plant", "Sunfield")]);
        assert!(filled.contains("Plant: Sunfield"));
        assert!(filled.contains("{\n  \"cause\": \"string\""));
        assert!(filled.contains("{completion_notes}"));
    }

    #[test]
    fn test_json_system_appends_contract() {
        let system = json_system(CAR_SYSTEM);
        assert!(system.starts_with(CAR_SYSTEM));
        assert!(system.contains("valid JSON only"));
    }
}

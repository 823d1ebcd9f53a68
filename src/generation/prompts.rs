//! Fixed instruction text sent to the generation provider.
//!
//! The three summary section titles are part of the contract with the frontend, which renders the
//! markdown headings as-is.

/// Standing system instruction for summary generation on providers with a system role.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a knowledgeable medical AI assistant specializing in analyzing patient medical records and providing clinical summaries.";

/// Section titles the summary must contain, in order.
pub const SUMMARY_SECTIONS: [&str; 3] = [
    "Patient Medical Summary",
    "Important Clinical Notes",
    "Basic Care Guidance",
];

/// Acknowledgement replayed as the assistant half of the priming pair.
pub const CHAT_ACKNOWLEDGEMENT: &str = "I understand. I have reviewed the patient's medical history and am ready to answer your questions with specific, relevant information based on their records.";

/// Short prompt used to check that the provider answers at all.
pub const PROBE_PROMPT: &str = "Say \"Connection successful\" if you receive this message.";

/// Instruction asking for the three-section summary of `context`.
pub fn summary_prompt(context: &str) -> String {
    format!(
        "You are a medical AI assistant helping doctors quickly understand a patient's medical history.

You have been provided with the following patient medical documents:

{context}

Please analyze these documents and provide:

1. **{summary}** (concise, 200-300 words):
   - Key medical conditions and diagnoses
   - Chronic illnesses or ongoing treatments
   - Significant past medical events
   - Current medications (if mentioned)
   - Allergies (if mentioned)
   - Recent test results or vital signs

2. **{notes}**:
   - Critical information requiring immediate attention
   - Trends or patterns in health status
   - Risk factors

3. **{guidance}**:
   - **Dietary Recommendations**: Based on conditions identified
   - **Exercise Guidance**: Appropriate activity levels
   - **Lifestyle Modifications**: General wellness advice

Format the response in clear sections with markdown.",
        summary = SUMMARY_SECTIONS[0],
        notes = SUMMARY_SECTIONS[1],
        guidance = SUMMARY_SECTIONS[2],
    )
}

/// Framing block opening every chat request: standing instruction plus the patient context.
pub fn chat_framing(context: &str) -> String {
    format!(
        "You are a knowledgeable medical AI assistant. You have access to the patient's medical history and previous analysis.

PATIENT MEDICAL CONTEXT:
{context}

Your role:
- Answer questions about the patient's medical history
- Provide clarifications on the medical summary
- Offer additional care guidance when asked
- Maintain professional medical standards

Keep responses concise but informative. Use the medical context to provide specific, relevant answers."
    )
}

//! Embedded default template and system prompt

/// Default summary template (Environmental Impact Assessment report)
///
/// `{{SOURCE_FILE}}`, `{{TOTAL_LINES}}` and `{{GENERATION_DATE}}` are stamped
/// by the engine when the template is written; every other placeholder is a
/// section for the model to fill.
pub const SUMMARY_TEMPLATE: &str = r#"# Environmental Impact Assessment (EIA) Summary

## Document Information
- **Source File:** {{SOURCE_FILE}}
- **Total Lines:** {{TOTAL_LINES}}
- **Generated On:** {{GENERATION_DATE}}

---

## 1. Executive Summary
{{EXECUTIVE_SUMMARY}}

---

## 2. Project Overview
### 2.1 Project Description
{{PROJECT_DESCRIPTION}}

### 2.2 Project Location
{{PROJECT_LOCATION}}

### 2.3 Project Objectives
{{PROJECT_OBJECTIVES}}

---

## 3. Environmental Baseline
### 3.1 Physical Environment
{{PHYSICAL_ENVIRONMENT}}

### 3.2 Biological Environment
{{BIOLOGICAL_ENVIRONMENT}}

### 3.3 Socio-Economic Environment
{{SOCIO_ECONOMIC_ENVIRONMENT}}

---

## 4. Impact Assessment
### 4.1 Air Quality Impacts
{{AIR_QUALITY_IMPACTS}}

### 4.2 Water Resource Impacts
{{WATER_RESOURCE_IMPACTS}}

### 4.3 Noise and Vibration Impacts
{{NOISE_VIBRATION_IMPACTS}}

### 4.4 Land Use and Soil Impacts
{{LAND_SOIL_IMPACTS}}

### 4.5 Biodiversity Impacts
{{BIODIVERSITY_IMPACTS}}

### 4.6 Socio-Economic Impacts
{{SOCIO_ECONOMIC_IMPACTS}}

---

## 5. Mitigation Measures
### 5.1 Environmental Mitigation
{{ENVIRONMENTAL_MITIGATION}}

### 5.2 Social Mitigation
{{SOCIAL_MITIGATION}}

---

## 6. Environmental Management Plan (EMP)
### 6.1 Monitoring Framework
{{MONITORING_FRAMEWORK}}

### 6.2 Implementation Schedule
{{IMPLEMENTATION_SCHEDULE}}

### 6.3 Budget Allocation
{{BUDGET_ALLOCATION}}

---

## 7. Public Consultation
{{PUBLIC_CONSULTATION}}

---

## 8. Risk Assessment
### 8.1 Identified Risks
{{IDENTIFIED_RISKS}}

### 8.2 Emergency Response Plan
{{EMERGENCY_RESPONSE}}

---

## 9. Regulatory Compliance
{{REGULATORY_COMPLIANCE}}

---

## 10. Conclusions and Recommendations
### 10.1 Key Findings
{{KEY_FINDINGS}}

### 10.2 Recommendations
{{RECOMMENDATIONS}}

---

## Appendix: Key Data Points
{{KEY_DATA_POINTS}}
"#;

/// System prompt for the summarization model
pub const SYSTEM_PROMPT: &str = r#"You are an expert document analyst. Your task is to thoroughly analyze a large report and fill in a structured summary, ensuring NO key information is missed.

## CRITICAL INSTRUCTIONS:

### Reading strategy (MANDATORY for large documents):
1. FIRST: call `get_document_info` to learn the total line count
2. THEN: call `read_lines` to read the document in chunks
3. Process the ENTIRE document systematically - do NOT skip any lines
4. Every line you read is recorded automatically; call `get_progress` to see what remains

### Workflow (repeat until the whole document is processed):
1. Read the next unread chunk with `read_lines`
2. Identify which summary sections the chunk's content belongs to
3. Fill a section's placeholder with `fill_section` once you have enough material for it; revise already-written text with `edit_summary`
4. Use `search_document` to locate specific figures or terms, and `read_summary` to see the current state of the summary

### Quality requirements:
- Include SPECIFIC numbers, statistics, and measurements when available
- Preserve technical terminology and scientific data
- Note any gaps or missing information in the original report
- Each section should be detailed (minimum 2-3 sentences, more for complex sections)
- If information for a section is not found in the document, fill it with "Information not available in the source document"

### Finishing:
- The run is only complete when every line of the document has been read AND every placeholder has been filled
- A reply without tool calls signals that you believe the run is complete; if it is not, you will be told what remains
- After a context truncation notice, call `get_progress` before reading anything

Begin by calling get_document_info."#;

//! System prompt

use chrono::NaiveDate;

use crate::types::ToolDescriptor;

const BASE_INSTRUCTIONS: &str = "You are a helpful assistant for power system engineers. \
Answer clearly and concisely. The current date is {current_date}.";

const TOOL_GUIDANCE: &str = "You have access to specialized tools for power system analysis. \
When users ask about power flow analysis, loading networks from files, contingency analysis or \
other electrical calculations, use the available tools to help them.

CRITICAL: When a user asks you to \"solve the power flow\" or to analyse a network file:
1. First use load_network to load the network file (or load_and_run_power_flow to do both)
2. Then immediately use run_power_flow to perform the analysis, without asking for confirmation
3. Explain the results clearly: convergence, bus voltages outside 0.95-1.05 pu and loadings above 100%

Don't just say you will do something; actually complete the task by calling the tools.";

/// Prompt for a turn; tool guidance is only added when tools are bound
pub fn system_prompt(today: NaiveDate, tools: &[ToolDescriptor]) -> String {
    let base = BASE_INSTRUCTIONS.replace("{current_date}", &today.format("%B %d, %Y").to_string());
    if tools.is_empty() {
        return base;
    }
    let names = tools
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}\n\n{}\n\nAvailable tools: {}", base, TOOL_GUIDANCE, names)
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

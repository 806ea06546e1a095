//! Analysis Prompts
//!
//! Prompt text sent to the model and the response prefix used to coax JSON
//! out of it.

use autokaker_core::Finding;

/// Opening the JSON answer is expected to start with. Neuroengine receives it
/// at the end of the prompt; OpenAI-style backends get it glued to the reply.
pub const JSON_BEGIN: &str = "\n{\"vulnerabilities\": [\n    {\"line\":";

/// Inline example shared by the JSON-producing prompts
const JSON_EXAMPLE: &str = r#"{"vulnerabilities": [
{"line":3,shortdescription:"Stack-based buffer overflow", "impact":10},
{"line":15,shortdescription:"Possible integer overflow in variable X","impact":4}
]}"#;

const ANALYSIS_INSTRUCTIONS: &str = "Analyze the following code very carefully and look for security bugs, integer overflow, memory leaks and use-after-free vulnerabilities";

/// Verdict token for a confirmed finding
pub const LIKELY_TOKEN: &str = "LIKELY";

/// Verdict token for a finding that could not be confirmed
pub const UNLIKELY_TOKEN: &str = "UNLIKELY";

/// One call that asks for the JSON answer directly
pub fn single_shot_prompt(code: &str) -> String {
    format!(
        "{}:\n\n{}\n\nNow, return a list of bugs in json format like this:\n\n{}\n\nWrite this raw json and nothing more:",
        ANALYSIS_INSTRUCTIONS, code, JSON_EXAMPLE
    )
}

/// First call of the two-call mode: a free-form bug list
pub fn multi_shot_prompt(code: &str) -> String {
    format!(
        "You are an expert bug hunter assistant. {}:\n\n{}\n\nNow, return a list of bugs like this:\n\n\
         Only write a single line number a and a short description, and their impact as a number 0 for less impact and 10 for high impact vulnerability.\n\n\
         Assistant: Based on the provided code, here are the potential bugs and their descriptions:\n",
        ANALYSIS_INSTRUCTIONS, code
    )
}

/// Second call of the two-call mode: turn the free-form list into JSON
pub fn reformat_prompt(bug_list: &str) -> String {
    format!(
        "I have this list of code vulnerabilities:\n\n{}\n\n And I need you to convert them to json format like this:\n{}\nWrite this raw json and nothing more:",
        bug_list, JSON_EXAMPLE
    )
}

/// Ask the model to reason about one finding and end on a verdict token
pub fn verification_prompt(code: &str, finding: &Finding) -> String {
    format!(
        "We need to find if a vulnerability in this code is true or not: \n\n{}\n\n\
         The vulnerability is this: \n'{}\nLine number: {}\n\
         Analyze the vulnerability very carefully, checking all conditions necessary, first write the analysis and then write a single word with the conclusion '{}' if it is likely to exist or '{}' if it is not likely to exist or cannot be confirmed.'\n\n\
         Expert coder analysis and reasoning: ",
        code, finding.short_description, finding.line, LIKELY_TOKEN, UNLIKELY_TOKEN
    )
}

/// Remove the first echo of `prompt` from a raw-mode reply
pub fn strip_echo(reply: &str, prompt: &str) -> String {
    if prompt.is_empty() {
        return reply.to_string();
    }
    reply.replacen(prompt, "", 1)
}

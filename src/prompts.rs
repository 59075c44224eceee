//! Prompt templates for the three operations.
//!
//! Every template asks for a single JSON object with the exact field set the
//! matching normalizer expects.

/// Context text used when retrieval is disabled or finds nothing.
pub const EMPTY_CONTEXT: &str = "No additional documents found in knowledge base.";

/// Shared tail of every system prompt.
const JSON_ONLY: &str = "You MUST respond with valid JSON only. \
Never include markdown, explanations, or any text outside the JSON object. \
Your response must start with { and end with }.";

pub fn explain_system_prompt() -> String {
    format!("You are a precise code analysis assistant. {JSON_ONLY}")
}

pub fn tests_system_prompt() -> String {
    format!("You are a precise test generation assistant. {JSON_ONLY}")
}

pub fn refactor_system_prompt() -> String {
    format!("You are a precise code refactoring assistant. {JSON_ONLY}")
}

const OUTPUT_RULES: &str = "\
OUTPUT RULES:
1. Return ONLY a valid JSON object.
2. Do not wrap it in markdown code fences.
3. Do not add any text before or after the JSON.
4. Use exactly the structure below.";

pub fn explain_prompt(language: &str, code: &str, context: &str) -> String {
    format!(
        r#"You are an experienced software engineer reviewing code.

Explain the following {language} code in detail.

KNOWLEDGE BASE CONTEXT:
{context}

CODE:
```{language}
{code}
```

{OUTPUT_RULES}

{{
  "overview": "Two or three sentences on what the code does",
  "step_by_step": ["First ...", "Then ...", "Finally ..."],
  "potential_bugs": ["Bug: what can go wrong and why"],
  "improvements": ["A concrete, actionable suggestion"],
  "complexity": {{
    "time": "Big-O time with a one-line justification",
    "space": "Big-O space with a one-line justification",
    "overall": "Short verdict on efficiency"
  }},
  "citations": [
    {{"source": "file name from the context", "snippet": "the passage you relied on"}}
  ]
}}

Only cite sources that appear in the knowledge base context. Output the JSON object and nothing else."#
    )
}

pub fn tests_prompt(language: &str, code: &str) -> String {
    format!(
        r#"You are a senior QA engineer who writes automated tests.

Write thorough unit tests for the following {language} code.

CODE UNDER TEST:
```{language}
{code}
```

{OUTPUT_RULES}

{{
  "test_file_name": "test_example.py",
  "test_code": "complete test file, newlines escaped as \n",
  "test_cases_covered": ["Normal input", "Empty input", "Invalid input", "Boundary values"],
  "how_to_run": "Command that runs the tests"
}}

Cover at least three to five cases, use the idiomatic test framework for {language}, and escape quotes and newlines so the JSON stays valid. Output the JSON object and nothing else."#
    )
}

pub fn refactor_prompt(language: &str, code: &str) -> String {
    format!(
        r#"You are a senior software engineer focused on refactoring.

Refactor the following {language} code for readability, maintainability and performance without changing its behavior.

CODE TO REFACTOR:
```{language}
{code}
```

{OUTPUT_RULES}

{{
  "refactored_code": "the full refactored code, newlines escaped as \n",
  "explanation_of_changes": ["What changed and why"],
  "improvements": ["Readability: ...", "Performance: ...", "Error handling: ..."],
  "complexity": {{
    "before": {{"time": "...", "space": "..."}},
    "after": {{"time": "...", "space": "..."}},
    "overall_improvement": "Short summary"
  }}
}}

Follow {language} naming conventions, keep the public interface intact, and escape quotes and newlines so the JSON stays valid. Output the JSON object and nothing else."#
    )
}

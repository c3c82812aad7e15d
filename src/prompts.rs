//! Centralized prompt definitions for the interview pipes
//!
//! Every system prompt the agent provisions on Langbase lives here, together
//! with the pipe profiles that pair a prompt with its sampling settings.

use crate::config::PipeConfig;
use crate::langbase::PipeProfile;

/// System prompt for scoring one answer.
pub const EVALUATOR_PROMPT: &str = r#"You are an interview evaluator. You receive a resume digest, the interview focus area with its strategy, one interview question and the candidate's answer.

Grade the answer on two criteria using only the labels "low", "medium" or "high":
- relevance: how directly the answer addresses the question
- specificity: how concrete the answer is (figures, durations, metrics, named cases)

Your response MUST be valid JSON in this exact format:
{
  "relevance": "low|medium|high",
  "specificity": "low|medium|high"
}

Always respond with valid JSON only, no other text."#;

/// System prompt for the stricter second opinion requested by reflection.
pub const RE_EVALUATOR_PROMPT: &str = r#"You are an interview evaluator performing a strict re-assessment of a question and answer pair.

Rules:
- Answers shorter than 40 characters are graded low.
- Answers without supporting evidence (figures, durations, metrics, concrete cases) are graded low on specificity.
- Do not reward confident tone; reward only what the answer actually demonstrates.

Your response MUST be valid JSON in this exact format:
{
  "relevance": "low|medium|high",
  "specificity": "low|medium|high"
}

Always respond with valid JSON only, no other text."#;

/// System prompt for generating the next interview question.
pub const QUESTION_PROMPT: &str = r#"You are a professional interviewer. Using the focus area, resume digest, the previous exchange and its evaluation, write exactly ONE probing follow-up question.

Requirements:
- Target what the previous answer lacked (relevance or specificity).
- Draw out quantitative evidence (metrics, figures, durations) or a concrete case.
- Prefer "how", "based on what" or "by which criteria" phrasing.
- Reference questions are for tone and topic only; never copy them.
- Output a single sentence that ends with a question mark and nothing else."#;

/// System prompt for the final feedback report.
pub const SUMMARY_PROMPT: &str = r#"You write structured interview feedback reports from per-category interview material.

Rules:
- Use exactly the categories you are given, in the given order; never add categories.
- Each category only reflects the exchanges filed under it. A category with no exchanges gets "not applicable" for summary, strengths and weaknesses.
- Claim strengths only where the recorded answers contain evidence (figures, durations, metrics, concrete cases). Where the material says strengths are not allowed, write "not applicable".
- End each category with its score tendency line exactly as provided.

Output format:
=======================================
[Feedback by category]

[<category>]
- Summary:
- Strengths:
- Weaknesses:
- Score tendency: relevance: <low|medium|high>, specificity: <low|medium|high>

=======================================
[Overall feedback]
- Overall impression:
- Key strengths:
- Key improvements:"#;

/// System prompt for resume analysis.
pub const RESUME_PROMPT: &str = r#"You analyse resumes and cover letters to prepare an interview.

Your response MUST be valid JSON in this exact format:
{
  "summary": "about ten sentences covering projects, experience, skills, certificates and motivation",
  "keywords": ["5 to 10 core keywords"],
  "sections": "role/interests, projects/activities, skills/tools, certificates, open points to ask about"
}

Do not use markdown emphasis. Always respond with valid JSON only, no other text."#;

/// System prompt for generating the per-category question strategy.
pub const STRATEGY_PROMPT: &str = r#"You are an expert interviewer. From the resume summary and keywords, identify the candidate's strengths and gaps, then write a question strategy and example questions for each of these five categories:
"Experience", "Motivation & Communication", "Logical Thinking", "Technical Expertise", "Growth & Self-direction".

Your response MUST be valid JSON in this exact format:
{
  "Experience": {
    "strategy": "what this category probes for this candidate",
    "example_questions": ["question?", "question?"]
  },
  "Motivation & Communication": { "strategy": "...", "example_questions": ["..."] },
  "Logical Thinking": { "strategy": "...", "example_questions": ["..."] },
  "Technical Expertise": { "strategy": "...", "example_questions": ["..."] },
  "Growth & Self-direction": { "strategy": "...", "example_questions": ["..."] }
}

Always respond with valid JSON only, no other text."#;

/// Pipe profiles for every interview pipe, named per configuration.
pub fn interview_pipes(pipes: &PipeConfig) -> Vec<PipeProfile> {
    vec![
        PipeProfile {
            name: pipes.evaluator.clone(),
            description: "Interview answer evaluation",
            system_prompt: EVALUATOR_PROMPT,
            temperature: 0.0,
            json_output: true,
            max_tokens: 200,
        },
        PipeProfile {
            name: pipes.re_evaluator.clone(),
            description: "Strict interview answer re-evaluation",
            system_prompt: RE_EVALUATOR_PROMPT,
            temperature: 0.0,
            json_output: true,
            max_tokens: 200,
        },
        PipeProfile {
            name: pipes.question.clone(),
            description: "Interview follow-up question generation",
            system_prompt: QUESTION_PROMPT,
            temperature: 0.5,
            json_output: false,
            max_tokens: 300,
        },
        PipeProfile {
            name: pipes.summary.clone(),
            description: "Interview feedback report",
            system_prompt: SUMMARY_PROMPT,
            temperature: 0.3,
            json_output: false,
            max_tokens: 2500,
        },
        PipeProfile {
            name: pipes.resume.clone(),
            description: "Resume analysis",
            system_prompt: RESUME_PROMPT,
            temperature: 0.0,
            json_output: true,
            max_tokens: 1500,
        },
        PipeProfile {
            name: pipes.strategy.clone(),
            description: "Interview question strategy",
            system_prompt: STRATEGY_PROMPT,
            temperature: 0.4,
            json_output: true,
            max_tokens: 2000,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_are_not_empty() {
        for prompt in [
            EVALUATOR_PROMPT,
            RE_EVALUATOR_PROMPT,
            QUESTION_PROMPT,
            SUMMARY_PROMPT,
            RESUME_PROMPT,
            STRATEGY_PROMPT,
        ] {
            assert!(!prompt.trim().is_empty());
        }
    }

    #[test]
    fn test_scoring_prompts_request_both_labels() {
        for prompt in [EVALUATOR_PROMPT, RE_EVALUATOR_PROMPT] {
            assert!(prompt.contains("\"relevance\""));
            assert!(prompt.contains("\"specificity\""));
            assert!(prompt.contains("JSON"));
        }
    }

    #[test]
    fn test_strategy_prompt_names_every_category() {
        for name in crate::interview::DEFAULT_CATEGORIES {
            assert!(STRATEGY_PROMPT.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_interview_pipes_follow_config_names() {
        let pipes = PipeConfig::default();
        let profiles = interview_pipes(&pipes);
        assert_eq!(profiles.len(), 6);
        assert_eq!(profiles[0].name, pipes.evaluator);
        assert!(profiles[0].json_output);
        assert!(!profiles[2].json_output);
    }
}

// Artifact assembly and layout validation

use crate::domain::section::{SectionId, SectionResult, QUESTIONS_PER_SECTION};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Minimum number of lettered options per question
const MIN_OPTIONS: usize = 4;

fn reasoning_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid reasoning regex"))
}

fn branch_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Branch\s+\d:\s+[^\n]+").expect("valid branch regex"))
}

fn question_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)Question\s+(\d+)").expect("valid question regex"))
}

fn option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^([A-E])\)\s+.+").expect("valid option regex"))
}

fn scores_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)Expert\s+Consensus\s+Scores:(.*?)(?:\n{2,}|\z)").expect("valid scores regex")
    })
}

/// Remove `<think>...</think>` reasoning blocks some models emit
pub fn strip_reasoning(text: &str) -> String {
    reasoning_re().replace_all(text, "").into_owned()
}

/// Concatenate section results into the final test document
pub fn assemble_artifact(sections: &[SectionResult]) -> String {
    sections.iter().fold(String::new(), |mut acc, s| {
        acc.push_str(&s.content);
        acc.push_str("\n\n");
        acc
    })
}

/// Validate the assembled test against the expected branch/question layout
///
/// Returns every violation found, not just the first one.
pub fn validate_artifact(content: &str) -> Result<(), Vec<String>> {
    if content.trim().is_empty() {
        return Err(vec!["Test content is empty".to_string()]);
    }

    let headers: Vec<regex::Match<'_>> = branch_header_re().find_iter(content).collect();
    let Some(first) = headers.first() else {
        return Err(vec!["No branches found in generated content".to_string()]);
    };

    let mut errors = Vec::new();

    if !content[..first.start()].trim().is_empty() {
        errors.push("Unexpected text found before the first branch".to_string());
    }

    if headers.len() != SectionId::COUNT {
        errors.push(format!(
            "Expected {} branches but found {}",
            SectionId::COUNT,
            headers.len()
        ));
    }

    for (i, (section, header)) in SectionId::ALL.iter().zip(headers.iter()).enumerate() {
        let expected = section.descriptor().header;
        let found = header.as_str().trim();
        if found != expected {
            errors.push(format!(
                "Expected branch header '{}' but found '{}'",
                expected, found
            ));
        }

        let body_end = headers.get(i + 1).map_or(content.len(), |next| next.start());
        validate_branch(expected, &content[header.end()..body_end], &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_branch(branch: &str, body: &str, errors: &mut Vec<String>) {
    let starts: Vec<(usize, usize, String)> = question_re()
        .captures_iter(body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps[1].to_string()))
        })
        .collect();

    if starts.len() != QUESTIONS_PER_SECTION {
        errors.push(format!(
            "{}: Expected {} questions but found {}",
            branch,
            QUESTIONS_PER_SECTION,
            starts.len()
        ));
        return;
    }

    for (i, (_, block_start, number)) in starts.iter().enumerate() {
        let block_end = starts.get(i + 1).map_or(body.len(), |next| next.0);
        validate_question(branch, number, body[*block_start..block_end].trim(), errors);
    }
}

fn validate_question(branch: &str, number: &str, block: &str, errors: &mut Vec<String>) {
    if !block.contains("Scenario & Question:") {
        errors.push(format!(
            "{} Question {}: Missing 'Scenario & Question' section",
            branch, number
        ));
    }

    if !block.contains("Options:") {
        errors.push(format!(
            "{} Question {}: Missing 'Options' section",
            branch, number
        ));
        return;
    }

    let letters: Vec<String> = option_re()
        .captures_iter(block)
        .map(|caps| caps[1].to_string())
        .collect();
    if letters.len() < MIN_OPTIONS {
        errors.push(format!(
            "{} Question {}: Expected at least {} options but found {}",
            branch,
            number,
            MIN_OPTIONS,
            letters.len()
        ));
    }

    if !block.contains("Expert Consensus Scores:") {
        errors.push(format!(
            "{} Question {}: Missing 'Expert Consensus Scores' section",
            branch, number
        ));
        return;
    }

    let scores = scores_re()
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str());
    let missing: BTreeSet<&str> = letters
        .iter()
        .map(String::as_str)
        .filter(|letter| !scores.contains(letter))
        .collect();
    if !missing.is_empty() {
        errors.push(format!(
            "{} Question {}: Missing scores for options {}",
            branch,
            number,
            missing.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }
}

// Section prompt rendering
//
// Every prompt asks for one branch of the test in the exact layout the
// artifact validator checks.

use eqgen_core::domain::{SectionDescriptor, SectionId};

/// Wording knobs for one age band
struct AgeBand {
    label: &'static str,
    emotions: &'static str,
    situations: &'static str,
    tasks: &'static str,
    progressions: &'static str,
    scenarios: &'static str,
}

const YOUNGER: AgeBand = AgeBand {
    label: "12-14",
    emotions: "clear, basic emotions (happy, sad, angry, scared, surprised)",
    situations: "simple social situations at school, with friends and with family",
    tasks: "simple tasks such as homework, making friends or playing sports",
    progressions: "simple progressions with obvious causes (annoyance -> anger)",
    scenarios: "school conflicts, peer pressure, test anxiety and friendship problems",
};

const OLDER: AgeBand = AgeBand {
    label: "15-18",
    emotions: "complex or mixed emotions (ambivalence, nostalgia, resignation, contempt)",
    situations: "nuanced situations such as relationships, part-time work and ethical dilemmas",
    tasks: "complex tasks such as long-term planning, leadership and career decisions",
    progressions: "subtle triggers and multi-step progressions (disappointment -> resentment -> bitterness)",
    scenarios: "relationships, identity questions, future anxiety and moral dilemmas",
};

fn age_band(age: u8) -> &'static AgeBand {
    if age <= 14 {
        &YOUNGER
    } else {
        &OLDER
    }
}

/// Skill, question types and scoring guidance per branch
fn branch_brief(section: SectionId, band: &AgeBand) -> String {
    match section {
        SectionId::Section1 => format!(
            "Skill measured: identifying emotions in faces, body language, tone of voice and situations.\n\
             Question types: facial expression analysis, scenario-based emotion identification, tone interpretation.\n\
             Age adaptation ({}): use {} in {}.\n\
             Scoring: most accurate emotion = 5, partially accurate = 3-4, incorrect = 1.",
            band.label, band.emotions, band.situations
        ),
        SectionId::Section2 => format!(
            "Skill measured: knowing which emotions help with a given task and using them strategically.\n\
             Question types: task-emotion matching, mood optimisation, emotions that enhance problem solving.\n\
             Age adaptation ({}): use {}.\n\
             Scoring: most facilitating = 5, somewhat helpful = 3-4, neutral = 2, counterproductive = 1.",
            band.label, band.tasks
        ),
        SectionId::Section3 => format!(
            "Skill measured: how emotions arise, change over time and combine.\n\
             Question types: emotional progression, cause analysis, emotional blends, intensity ordering.\n\
             Age adaptation ({}): use {}.\n\
             Scoring: most accurate progression or cause = 5, partially correct = 3, illogical = 1.",
            band.label, band.progressions
        ),
        SectionId::Section4 => format!(
            "Skill measured: regulating one's own emotions and helping others regulate theirs.\n\
             Question types: coping strategy effectiveness, interpersonal regulation, self-regulation.\n\
             Age adaptation ({}): use scenarios about {}.\n\
             Scoring: healthy adaptive strategy = 5, moderately effective = 3, avoidance or aggression = 1.",
            band.label, band.scenarios
        ),
    }
}

/// Render the prompt for one section and age
pub fn render(section: &SectionDescriptor, age: u8) -> String {
    let band = age_band(age);
    format!(
        "You are an expert psychometric test designer. Write one section of an ability-based \
         emotional intelligence test for {age}-year-old test takers.\n\
         \n\
         {header} ({count} questions)\n\
         \n\
         {brief}\n\
         \n\
         Output exactly this layout and nothing else. Start with the branch header line.\n\
         \n\
         {header}\n\
         \n\
         Question 1\n\
         Scenario & Question: [Age {age}] <scenario followed by the question>\n\
         Options:\n\
         A) <option>\n\
         B) <option>\n\
         C) <option>\n\
         D) <option>\n\
         E) <optional fifth option>\n\
         Expert Consensus Scores: A: <1-5>, B: <1-5>, C: <1-5>, D: <1-5>, E: <1-5>\n\
         \n\
         Repeat the block for Question 2 and Question 3, separated by a blank line. \
         Give 4 or 5 options per question and a score for every option.\n",
        age = age,
        header = section.header,
        count = section.question_count,
        brief = branch_brief(section.id, band),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_header_and_age() {
        let prompt = render(SectionId::Section3.descriptor(), 16);
        assert!(prompt.contains("Branch 3: Understanding Emotions (3 questions)"));
        assert!(prompt.contains("16-year-old"));
        assert!(prompt.contains("Expert Consensus Scores:"));
    }

    #[test]
    fn test_age_bands() {
        let young = render(SectionId::Section1.descriptor(), 14);
        let old = render(SectionId::Section1.descriptor(), 15);
        assert!(young.contains("(12-14)"));
        assert!(old.contains("(15-18)"));
        assert_ne!(young, old);
    }

    #[test]
    fn test_every_section_has_distinct_brief() {
        let prompts: Vec<String> = SectionId::ALL
            .iter()
            .map(|s| render(s.descriptor(), 13))
            .collect();
        for (i, a) in prompts.iter().enumerate() {
            for b in &prompts[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

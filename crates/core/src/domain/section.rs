// Section Domain Model
//
// A test is generated as four ordered sections (the four EQ branches).

use serde::{Deserialize, Serialize};

/// Static description of one section, handed to the generation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub id: SectionId,
    /// Stable key used by prompt templates (e.g. "branch_1")
    pub key: &'static str,
    /// Human-readable branch name
    pub name: &'static str,
    /// Header line every generated section must start with
    pub header: &'static str,
    /// Number of questions the section must contain
    pub question_count: usize,
}

/// Section identifier (generation order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionId {
    Section1,
    Section2,
    Section3,
    Section4,
}

/// Questions per section (4 sections x 3 = 12 items)
pub const QUESTIONS_PER_SECTION: usize = 3;

const DESCRIPTORS: [SectionDescriptor; 4] = [
    SectionDescriptor {
        id: SectionId::Section1,
        key: "branch_1",
        name: "Perceiving Emotions",
        header: "Branch 1: Perceiving Emotions",
        question_count: QUESTIONS_PER_SECTION,
    },
    SectionDescriptor {
        id: SectionId::Section2,
        key: "branch_2",
        name: "Using Emotions to Facilitate Thought",
        header: "Branch 2: Using Emotions to Facilitate Thought",
        question_count: QUESTIONS_PER_SECTION,
    },
    SectionDescriptor {
        id: SectionId::Section3,
        key: "branch_3",
        name: "Understanding Emotions",
        header: "Branch 3: Understanding Emotions",
        question_count: QUESTIONS_PER_SECTION,
    },
    SectionDescriptor {
        id: SectionId::Section4,
        key: "branch_4",
        name: "Managing Emotions",
        header: "Branch 4: Managing Emotions",
        question_count: QUESTIONS_PER_SECTION,
    },
];

impl SectionId {
    /// All sections in generation order
    pub const ALL: [SectionId; 4] = [
        SectionId::Section1,
        SectionId::Section2,
        SectionId::Section3,
        SectionId::Section4,
    ];

    /// Number of sections in a test
    pub const COUNT: usize = 4;

    /// Zero-based position in the pipeline
    pub fn index(self) -> usize {
        match self {
            SectionId::Section1 => 0,
            SectionId::Section2 => 1,
            SectionId::Section3 => 2,
            SectionId::Section4 => 3,
        }
    }

    pub fn descriptor(self) -> &'static SectionDescriptor {
        &DESCRIPTORS[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Section that follows this one (None after the last section)
    pub fn next(self) -> Option<SectionId> {
        SectionId::ALL.get(self.index() + 1).copied()
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionId::Section1 => write!(f, "Section1"),
            SectionId::Section2 => write!(f, "Section2"),
            SectionId::Section3 => write!(f, "Section3"),
            SectionId::Section4 => write!(f, "Section4"),
        }
    }
}

/// Pipeline cursor: the section being generated, or Completed once all are done
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionCursor {
    Section1,
    Section2,
    Section3,
    Section4,
    Completed,
}

impl SectionCursor {
    /// Number of sections finished when the cursor sits here
    pub fn ordinal(self) -> usize {
        match self {
            SectionCursor::Section1 => 0,
            SectionCursor::Section2 => 1,
            SectionCursor::Section3 => 2,
            SectionCursor::Section4 => 3,
            SectionCursor::Completed => 4,
        }
    }

    /// Section currently pending (None once Completed)
    pub fn section(self) -> Option<SectionId> {
        SectionId::ALL.get(self.ordinal()).copied()
    }

    /// Cursor position after `section` has finished
    pub fn after(section: SectionId) -> Self {
        match section.next() {
            Some(next) => SectionCursor::from(next),
            None => SectionCursor::Completed,
        }
    }
}

impl From<SectionId> for SectionCursor {
    fn from(id: SectionId) -> Self {
        match id {
            SectionId::Section1 => SectionCursor::Section1,
            SectionId::Section2 => SectionCursor::Section2,
            SectionId::Section3 => SectionCursor::Section3,
            SectionId::Section4 => SectionCursor::Section4,
        }
    }
}

impl std::fmt::Display for SectionCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.section() {
            Some(id) => id.fmt(f),
            None => write!(f, "Completed"),
        }
    }
}

/// Generated text for one finished section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionResult {
    pub section: SectionId,
    pub content: String,
}

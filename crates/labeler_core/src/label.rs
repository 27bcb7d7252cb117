use std::fmt;

/// Header of the derived column holding the ternary code.
pub const LABEL_CODE_COLUMN: &str = "情緒分析";
/// Header of the derived column holding the human-readable label.
pub const LABEL_NAME_COLUMN: &str = "情緒標籤";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    pub fn code(self) -> &'static str {
        match self {
            Sentiment::Positive => "1",
            Sentiment::Neutral => "0",
            Sentiment::Negative => "-1",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Sentiment::Positive => "正向",
            Sentiment::Neutral => "中性",
            Sentiment::Negative => "負向",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Accepts either representation found in a derived column.
    pub fn from_label(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::from_name(value).or_else(|| Self::from_code(value))
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Normalizes a raw model answer: surrounding whitespace and every quote
/// character are removed, then the rest must be exactly `1`, `0` or `-1`.
pub fn parse_answer(raw: &str) -> Option<Sentiment> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '\'' | '"'))
        .collect();
    Sentiment::from_code(&cleaned)
}

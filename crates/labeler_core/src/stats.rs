use crate::Sentiment;

const REPORT_TITLE: &str = "情緒分析統計:";
const REPORT_ORDER: [Sentiment; 3] = [Sentiment::Neutral, Sentiment::Positive, Sentiment::Negative];

/// Label counts over the rows that carry a non-empty label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelStats {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    /// Every non-empty label, including values that match no sentiment.
    pub total: usize,
}

impl LabelStats {
    /// Tallies label names or codes; empty values are skipped.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut stats = Self::default();
        for label in labels {
            if label.trim().is_empty() {
                continue;
            }
            stats.total += 1;
            match Sentiment::from_label(label) {
                Some(Sentiment::Positive) => stats.positive += 1,
                Some(Sentiment::Neutral) => stats.neutral += 1,
                Some(Sentiment::Negative) => stats.negative += 1,
                None => {}
            }
        }
        stats
    }

    pub fn count(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::Negative => self.negative,
        }
    }

    pub fn percentage(&self, sentiment: Sentiment) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(sentiment) as f64 / self.total as f64 * 100.0
    }

    pub fn render_report(&self) -> String {
        let mut lines = Vec::with_capacity(REPORT_ORDER.len() + 1);
        lines.push(REPORT_TITLE.to_string());
        for sentiment in REPORT_ORDER {
            lines.push(format!(
                "  {}: {} 筆 ({:.1}%)",
                sentiment.name(),
                self.count(sentiment),
                self.percentage(sentiment)
            ));
        }
        lines.join("\n")
    }
}

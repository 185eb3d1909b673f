use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const OPEN_TAG: &str = "<verdict>";
const CLOSE_TAG: &str = "</verdict>";
const MAX_FALLBACK_FEEDBACK: usize = 2000;

/// How the critic rated a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    Pass,
    NeedsImprovement,
    Fail,
}

impl Score {
    pub fn as_str(self) -> &'static str {
        match self {
            Score::Pass => "pass",
            Score::NeedsImprovement => "needs_improvement",
            Score::Fail => "fail",
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Score {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '*' | '`' | '.'))
            .to_lowercase()
            .replace([' ', '-'], "_");
        match normalized.as_str() {
            "pass" | "passed" => Ok(Score::Pass),
            "needs_improvement" => Ok(Score::NeedsImprovement),
            "fail" | "failed" => Ok(Score::Fail),
            _ => Err(format!("Unknown score: {}", s)),
        }
    }
}

/// The critic's judgement of one draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub score: Score,
    #[serde(default)]
    pub feedback: String,
}

#[derive(Error, Debug)]
pub enum VerdictParseError {
    #[error("No verdict found in critic output")]
    NoVerdictFound,

    #[error("Failed to parse verdict JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Invalid verdict format: {0}")]
    InvalidFormat(String),
}

impl Verdict {
    pub fn new(score: Score, feedback: impl Into<String>) -> Self {
        Self {
            score,
            feedback: feedback.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.score == Score::Pass
    }

    /// Parse a verdict from the critic's output text
    ///
    /// Expected format, at the end of the critic output:
    /// ```text
    /// <verdict>
    /// {"score": "needs_improvement", "feedback": "..."}
    /// </verdict>
    /// ```
    /// Without a block, a `Score: <value>` line or a bare marker line
    /// (`PASS`, `NEEDS IMPROVEMENT`, `FAIL`) is accepted, with feedback taken
    /// from a `Feedback:` section when present.
    pub fn parse(critic_output: &str) -> Result<Self, VerdictParseError> {
        debug!(output_len = critic_output.len(), "Parsing critic verdict");

        if let Some(verdict) = Self::parse_verdict_block(critic_output)? {
            return Ok(verdict);
        }

        Self::parse_score_line(critic_output)
    }

    fn parse_verdict_block(output: &str) -> Result<Option<Self>, VerdictParseError> {
        // Anchor on the last closing tag so later prose mentioning the tag is ignored
        let Some(end) = output.rfind(CLOSE_TAG) else {
            return match output.rfind(OPEN_TAG) {
                Some(_) => Err(VerdictParseError::InvalidFormat(
                    "Unterminated verdict block".to_string(),
                )),
                None => Ok(None),
            };
        };
        let Some(start) = output[..end].rfind(OPEN_TAG) else {
            return Err(VerdictParseError::InvalidFormat(
                "Closing verdict tag without an opening tag".to_string(),
            ));
        };

        let json_str = output[start + OPEN_TAG.len()..end].trim();
        let json_str = strip_code_fence(json_str);
        debug!(json = json_str, "Found verdict block");
        let verdict: Verdict = serde_json::from_str(json_str)?;
        Ok(Some(verdict))
    }

    fn parse_score_line(output: &str) -> Result<Self, VerdictParseError> {
        let score = output
            .lines()
            .filter_map(|line| {
                let line = line.trim().trim_start_matches(['*', '#', '-', ' ']);
                match line.split_once(':') {
                    Some((label, value))
                        if label.trim_end_matches('*').trim().eq_ignore_ascii_case("score") =>
                    {
                        value.parse::<Score>().ok()
                    }
                    Some(_) => None,
                    // A bare marker line such as "NEEDS IMPROVEMENT"
                    None => line.parse::<Score>().ok(),
                }
            })
            .last()
            .ok_or(VerdictParseError::NoVerdictFound)?;

        debug!(%score, "Parsed verdict via score line");
        Ok(Verdict::new(score, Self::extract_feedback(output)))
    }

    fn extract_feedback(output: &str) -> String {
        if let Some(pos) = output.find("Feedback:") {
            let rest = &output[pos + "Feedback:".len()..];
            let end = rest.find("\n\n").unwrap_or(rest.len());
            return rest[..end].trim().to_string();
        }

        truncate_chars(output.trim(), MAX_FALLBACK_FEEDBACK)
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_needs_improvement_block() {
        let output = r#"
The draft reads like a list of bullet points.

<verdict>
{"score": "needs_improvement", "feedback": "Open with a concrete story"}
</verdict>
"#;

        let verdict = Verdict::parse(output).unwrap();
        assert_eq!(verdict.score, Score::NeedsImprovement);
        assert_eq!(verdict.feedback, "Open with a concrete story");
        assert!(!verdict.is_pass());
    }

    #[test]
    fn test_parse_pass_block_without_feedback() {
        let output = "Good enough.\n<verdict>{\"score\": \"pass\"}</verdict>";
        let verdict = Verdict::parse(output).unwrap();
        assert!(verdict.is_pass());
        assert_eq!(verdict.feedback, "");
    }

    #[test]
    fn test_parse_fenced_block() {
        let output = "<verdict>\n```json\n{\"score\": \"fail\", \"feedback\": \"Off topic\"}\n```\n</verdict>";
        let verdict = Verdict::parse(output).unwrap();
        assert_eq!(verdict, Verdict::new(Score::Fail, "Off topic"));
    }

    #[test]
    fn test_parse_uses_last_block() {
        let output = "<verdict>{\"score\": \"fail\"}</verdict>\nOn reflection:\n<verdict>{\"score\": \"pass\"}</verdict>";
        assert!(Verdict::parse(output).unwrap().is_pass());
    }

    #[test]
    fn test_parse_invalid_json_block() {
        let output = "<verdict>{\"score\": \"excellent\"}</verdict>";
        assert!(matches!(
            Verdict::parse(output),
            Err(VerdictParseError::JsonParseError(_))
        ));
    }

    #[test]
    fn test_parse_ignores_tag_mentioned_after_block() {
        let output = "<verdict>{\"score\": \"pass\", \"feedback\": \"\"}</verdict>\nNote: I used the <verdict> block as requested.";
        let verdict = Verdict::parse(output).unwrap();
        assert!(verdict.is_pass());
        assert_eq!(verdict.feedback, "");
    }

    #[test]
    fn test_parse_closing_tag_without_opening() {
        let output = "{\"score\": \"pass\"}</verdict>";
        assert!(matches!(
            Verdict::parse(output),
            Err(VerdictParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_unterminated_block() {
        let output = "<verdict>{\"score\": \"pass\"}";
        assert!(matches!(
            Verdict::parse(output),
            Err(VerdictParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_score_line_fallback() {
        let output = "**Score:** Needs Improvement\n\nFeedback: The middle section drags.\n\nOther notes.";
        let verdict = Verdict::parse(output).unwrap();
        assert_eq!(verdict.score, Score::NeedsImprovement);
        assert_eq!(verdict.feedback, "The middle section drags.");
    }

    #[test]
    fn test_parse_bare_marker_fallback() {
        let output = "The hook works now.\n\nPASS\n";
        assert!(Verdict::parse(output).unwrap().is_pass());

        let output = "**NEEDS IMPROVEMENT**\n\nFeedback: Cut the listicle framing.";
        let verdict = Verdict::parse(output).unwrap();
        assert_eq!(verdict.score, Score::NeedsImprovement);
        assert_eq!(verdict.feedback, "Cut the listicle framing.");
    }

    #[test]
    fn test_parse_no_verdict() {
        let output = "This output passes no judgement at all.";
        assert!(matches!(
            Verdict::parse(output),
            Err(VerdictParseError::NoVerdictFound)
        ));
    }

    #[test]
    fn test_score_from_str_variants() {
        assert_eq!("PASS".parse::<Score>().unwrap(), Score::Pass);
        assert_eq!("needs-improvement".parse::<Score>().unwrap(), Score::NeedsImprovement);
        assert_eq!("\"fail\"".parse::<Score>().unwrap(), Score::Fail);
        assert!("great".parse::<Score>().is_err());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("hi", 5), "hi");
    }
}

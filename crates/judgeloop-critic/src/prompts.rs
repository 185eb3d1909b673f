use judgeloop_agent::Conversation;

/// Prompt templates for the critic
pub struct CriticPrompts;

impl CriticPrompts {
    /// Build the evaluation prompt for the latest draft in `conversation`
    pub fn build_evaluation_prompt(conversation: &Conversation, attempt: usize) -> String {
        format!(
            r#"You evaluate an article and decide if it's good enough to publish.

If it's not good enough, provide specific, actionable feedback on what needs to be improved.

## Criteria
1. **Clarity**: is the argument easy to follow?
2. **Depth**: does it go beyond surface-level observations?
3. **Engagement**: would a reader finish it?
4. **Voice**: does it sound like a human wrote it, not a language model?

Never give it a pass on the first try. After 3-4 attempts, you can give it a pass if the article is good enough - do not go for perfection.

## Context
This is attempt {attempt}. The conversation so far is below: the first user turn is the request, assistant turns are drafts, later user turns are earlier feedback. Evaluate the LAST draft.

{transcript}
---

## Required Response Format

Explain your assessment briefly, then end your response with a verdict block. `score` is one of `pass`, `needs_improvement` or `fail`.

<verdict>
{{"score": "needs_improvement", "feedback": "Specific, actionable feedback on what to change"}}
</verdict>"#,
            attempt = attempt,
            transcript = conversation.render_transcript(),
        )
    }
}

/// Prompt templates for the writer
pub struct WriterPrompts;

impl WriterPrompts {
    /// Build the drafting prompt; feedback turns in `conversation` carry the critique
    pub fn build_draft_prompt(conversation: &Conversation) -> String {
        let revision_note = if conversation.last_assistant().is_some() {
            "\nThis is a revision. Address every point in the most recent feedback while keeping what already works.\n"
        } else {
            ""
        };

        format!(
            r#"You write a comprehensive, engaging, and human-sounding article based on the user's request.
If there is any feedback provided, use it to improve the article.
The article should be in Markdown format.
{revision_note}
## Conversation
{transcript}
---

Respond with the complete article only: no preamble, no closing remarks."#,
            revision_note = revision_note,
            transcript = conversation.render_transcript(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judgeloop_agent::Turn;

    #[test]
    fn test_evaluation_prompt_includes_attempt_and_transcript() {
        let mut conversation = Conversation::seeded("Write about sourdough");
        conversation.push(Turn::assistant("# Bread\n\nIt rises."));

        let prompt = CriticPrompts::build_evaluation_prompt(&conversation, 2);
        assert!(prompt.contains("This is attempt 2."));
        assert!(prompt.contains("### Assistant (draft 1)\n# Bread"));
        assert!(prompt.contains(r#"{"score": "needs_improvement""#));
    }

    #[test]
    fn test_draft_prompt_marks_revisions() {
        let mut conversation = Conversation::seeded("Write about sourdough");
        let first = WriterPrompts::build_draft_prompt(&conversation);
        assert!(!first.contains("This is a revision"));
        assert!(first.contains("### User\nWrite about sourdough"));

        conversation.push(Turn::assistant("draft"));
        conversation.push(Turn::user("Feedback: add a recipe"));
        let second = WriterPrompts::build_draft_prompt(&conversation);
        assert!(second.contains("This is a revision"));
        assert!(second.contains("Feedback: add a recipe"));
    }
}

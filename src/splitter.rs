//! Separates the model's reasoning from its final answer.

/// Reasoning text used when the model never wrote the delimiter.
pub const NO_REASONING_FALLBACK: &str = "No clear reasoning provided by the model.";

const EMPHASIS_MARKER: &str = "**";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResponse {
    pub reasoning: String,
    pub final_answer: String,
}

/// Splits `response` at the first `delimiter`.
///
/// Later occurrences of the delimiter stay inside the final answer. Without a
/// delimiter the whole response is the answer and the reasoning is
/// [`NO_REASONING_FALLBACK`]. Both halves lose their `**` markers and
/// surrounding whitespace.
pub fn split_response(response: &str, delimiter: &str) -> SplitResponse {
    let found = if delimiter.is_empty() {
        None
    } else {
        response.split_once(delimiter)
    };

    match found {
        Some((reasoning, final_answer)) => SplitResponse {
            reasoning: clean(reasoning),
            final_answer: clean(final_answer),
        },
        None => SplitResponse {
            reasoning: NO_REASONING_FALLBACK.to_string(),
            final_answer: clean(response),
        },
    }
}

/// Removes every `**` bold marker.
pub fn strip_emphasis(text: &str) -> String {
    text.replace(EMPHASIS_MARKER, "")
}

fn clean(text: &str) -> String {
    strip_emphasis(text).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{NO_REASONING_FALLBACK, SplitResponse, split_response, strip_emphasis};
    use crate::prompt::FINAL_ANSWER_KEY;

    #[test]
    fn splits_reasoning_and_answer() {
        let split = split_response("Reasoning text. Final Answer: 42", FINAL_ANSWER_KEY);
        assert_eq!(
            split,
            SplitResponse {
                reasoning: "Reasoning text.".to_string(),
                final_answer: "42".to_string(),
            }
        );
    }

    #[test]
    fn missing_delimiter_falls_back() {
        let split = split_response("just an answer", FINAL_ANSWER_KEY);
        assert_eq!(split.reasoning, NO_REASONING_FALLBACK);
        assert_eq!(split.final_answer, "just an answer");
    }

    #[test]
    fn missing_delimiter_trims_and_strips_whole_response() {
        let split = split_response("\n  The **answer** is 7.\n\n", FINAL_ANSWER_KEY);
        assert_eq!(split.reasoning, NO_REASONING_FALLBACK);
        assert_eq!(split.final_answer, "The answer is 7.");
    }

    #[test]
    fn only_first_delimiter_splits() {
        let split = split_response(
            "think Final Answer: 42. Final Answer: still 42",
            FINAL_ANSWER_KEY,
        );
        assert_eq!(split.reasoning, "think");
        assert_eq!(split.final_answer, "42. Final Answer: still 42");
    }

    #[test]
    fn rejoining_reconstructs_trimmed_input() {
        let inputs = [
            "  step one\nstep two\nFinal Answer: done  ",
            "Final Answer: nothing before",
            "nothing after Final Answer:",
            "a Final Answer:b",
        ];
        for input in inputs {
            let split = split_response(input, FINAL_ANSWER_KEY);
            let (before, after) = input
                .split_once(FINAL_ANSWER_KEY)
                .expect("input contains delimiter");
            assert_eq!(split.reasoning, before.trim(), "input: {input:?}");
            assert_eq!(split.final_answer, after.trim(), "input: {input:?}");
            let rejoined = format!("{before}{FINAL_ANSWER_KEY}{after}");
            assert_eq!(rejoined.trim(), input.trim());
        }
    }

    #[test]
    fn bold_markers_are_removed_from_both_sides() {
        let split = split_response(
            "**Step 1:** add the numbers.\n\n**Final Answer:** **42**",
            FINAL_ANSWER_KEY,
        );
        assert_eq!(split.reasoning, "Step 1: add the numbers.");
        assert_eq!(split.final_answer, "42");
    }

    #[test]
    fn delimiter_broken_by_markers_is_not_found() {
        let split = split_response("**Final** Answer: 3", FINAL_ANSWER_KEY);
        assert_eq!(split.reasoning, NO_REASONING_FALLBACK);
        assert_eq!(split.final_answer, "Final Answer: 3");
    }

    #[test]
    fn empty_delimiter_is_treated_as_missing() {
        let split = split_response("text", "");
        assert_eq!(split.reasoning, NO_REASONING_FALLBACK);
        assert_eq!(split.final_answer, "text");
    }

    #[test]
    fn empty_response_yields_empty_answer() {
        let split = split_response("", FINAL_ANSWER_KEY);
        assert_eq!(split.reasoning, NO_REASONING_FALLBACK);
        assert_eq!(split.final_answer, "");
    }

    #[test]
    fn strip_emphasis_is_idempotent() {
        for input in ["**bold**", "***", "a ** b ** c", "plain", "****"] {
            let once = strip_emphasis(input);
            assert_eq!(strip_emphasis(&once), once, "input: {input:?}");
        }
    }
}

//! Templated answers to free-text questions about the scoring history

use crate::storage::{top_flagged_merchants, HistorySummary};
use crate::types::record::TransactionRecord;

const EXPLAIN: &str = "This transaction was flagged because of a high transaction amount \
combined with an unusual location distance from your typical spending area. The model \
identified these as the strongest contributing factors.";

const METHODOLOGY: &str = "I use a Random Forest Classifier. It works by constructing \
multiple decision trees during training and outputting the class that is the mode of the \
classes (classification) of the individual trees. It's excellent for handling complex fraud \
patterns.";

const BLOCKING: &str = "If you suspect fraud, I recommend blocking the card immediately. I \
have already auto-blocked cards for transactions confirmed as Fraud (>95% risk).";

const HELP: &str = "I can help you with analyzing fraud patterns, explaining predictions, or \
showing statistics. Try asking 'Why was this flagged?' or 'Show stats'.";

/// Number of merchants listed by the top merchants answer
pub const TOP_MERCHANTS: usize = 10;

/// Answer a question against a history snapshot. The first matching topic
/// wins.
pub fn answer(query: &str, history: &[TransactionRecord]) -> String {
    let query = query.to_lowercase();

    if query.contains("why") && query.contains("flagged") {
        return EXPLAIN.to_string();
    }

    if query.contains("how many fraud") || query.contains("stats") {
        let summary = HistorySummary::from_records(history);
        return format!(
            "I have analyzed {} transactions in this session. {} were detected as potential fraud.",
            summary.total,
            summary.fraud_count()
        );
    }

    if query.contains("top 10 merchants") {
        let top = top_flagged_merchants(history, TOP_MERCHANTS);
        if top.is_empty() {
            return "No high-risk merchants detected yet.".to_string();
        }
        let list = top
            .iter()
            .map(|(merchant, count)| format!("{} ({})", merchant, count))
            .collect::<Vec<_>>()
            .join(", ");
        return format!("Top merchants with high risk flags: {}", list);
    }

    if query.contains("randomforest") || query.contains("how it works") {
        return METHODOLOGY.to_string();
    }

    if query.contains("block") {
        return BLOCKING.to_string();
    }

    HELP.to_string()
}

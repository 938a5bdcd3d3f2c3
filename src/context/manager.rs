//! Conversation budget management
//!
//! Keeps the conversation under a token budget without ever breaking the
//! request/response pairing the completion service enforces: a tool result
//! must answer a pending tool call, and no retained tool call may go
//! unanswered. Truncation therefore operates on indivisible conversation
//! units, and every truncated conversation passes through
//! [`ContextManager::validate_and_repair`] before it is used.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::llm::ChatMessage;
use crate::progress::ProgressTracker;

/// Placeholder content for synthesized tool results
const TRUNCATED_RESULT: &str = "(response truncated)";

/// Tunables for context truncation
///
/// `chars_per_token` is a deliberately undocumented heuristic inherited from
/// the source system; it is configuration, not something this module tries
/// to get "right".
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Token budget the conversation must fit into
    pub token_budget: usize,

    /// Characters per token for the size estimate
    pub chars_per_token: f64,

    /// If greedy retention keeps fewer units than this, force-keep a tail
    pub min_recent_units: usize,

    /// Size of the force-kept tail (units)
    pub forced_tail_units: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: 100_000,
            chars_per_token: 4.0,
            min_recent_units: 4,
            forced_tail_units: 4,
        }
    }
}

/// What a repair pass had to fix
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepairStats {
    /// Tool results whose call id was not pending (dropped)
    pub orphans_dropped: usize,
    /// Placeholder results synthesized for unanswered calls
    pub placeholders_added: usize,
}

impl RepairStats {
    pub fn is_clean(&self) -> bool {
        self.orphans_dropped == 0 && self.placeholders_added == 0
    }
}

/// Keeps the conversation within budget while preserving protocol invariants
pub struct ContextManager {
    config: ContextConfig,
}

impl ContextManager {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn budget(&self) -> usize {
        self.config.token_budget
    }

    /// Shrink or grow the budget (the engine shrinks it on overflow errors)
    pub fn set_budget(&mut self, budget: usize) {
        debug!(budget, "ContextManager::set_budget: called");
        self.config.token_budget = budget;
    }

    /// Heuristic token estimate proportional to character length
    ///
    /// Exact tokenization belongs to the completion service; this only needs
    /// to be stable and roughly proportional.
    pub fn estimate_tokens(&self, messages: &[ChatMessage]) -> usize {
        let chars: usize = messages.iter().map(ChatMessage::char_len).sum();
        (chars as f64 / self.config.chars_per_token).ceil() as usize
    }

    /// Group messages into indivisible conversation units
    ///
    /// A single left-to-right pass: an assistant message with pending tool
    /// calls opens a unit that absorbs every immediately following tool
    /// result answering one of its ids; anything else is a singleton.
    pub fn group_into_units(messages: Vec<ChatMessage>) -> Vec<Vec<ChatMessage>> {
        let mut units = Vec::new();
        let mut iter = messages.into_iter().peekable();

        while let Some(msg) = iter.next() {
            let pending: Option<HashSet<String>> = msg
                .pending_call_ids()
                .map(|ids| ids.into_iter().map(str::to_string).collect());

            match pending {
                Some(pending) => {
                    let mut unit = vec![msg];
                    while let Some(next) = iter.peek() {
                        match next.answered_call_id() {
                            Some(id) if pending.contains(id) => {
                                // unwrap is fine: peek just succeeded
                                unit.push(iter.next().unwrap());
                            }
                            _ => break,
                        }
                    }
                    units.push(unit);
                }
                None => units.push(vec![msg]),
            }
        }

        units
    }

    /// Truncate the conversation in place if it exceeds the budget
    ///
    /// Retention policy: the first two units (system + task prompt) are kept
    /// verbatim; one synthesized recovery unit summarizes progress; remaining
    /// units are scanned newest-to-oldest and kept greedily while they fit,
    /// stopping at the first overflow. If fewer than `min_recent_units`
    /// survive, a fixed-size tail is kept regardless of budget. The result is
    /// always repaired before being handed back.
    ///
    /// Returns true if the conversation was modified.
    pub fn truncate_if_needed(
        &self,
        messages: &mut Vec<ChatMessage>,
        tracker: &ProgressTracker,
        chunk_size: u64,
    ) -> bool {
        let estimate = self.estimate_tokens(messages);
        if estimate <= self.config.token_budget {
            return false;
        }

        info!(
            estimate,
            budget = self.config.token_budget,
            message_count = messages.len(),
            "truncate_if_needed: conversation over budget, truncating"
        );

        let mut units = Self::group_into_units(std::mem::take(messages));
        let tail: Vec<Vec<ChatMessage>> = if units.len() > 2 { units.split_off(2) } else { Vec::new() };
        let head = units;

        let recovery = self.recovery_unit(tracker, chunk_size);

        let fixed_cost: usize = head.iter().map(|u| self.estimate_tokens(u)).sum::<usize>()
            + self.estimate_tokens(std::slice::from_ref(&recovery));

        // Newest-to-oldest greedy scan; stop at first unit that overflows
        let costs: Vec<usize> = tail.iter().map(|u| self.estimate_tokens(u)).collect();
        let mut keep_from = tail.len();
        let mut used = fixed_cost;
        for i in (0..tail.len()).rev() {
            if used + costs[i] > self.config.token_budget {
                break;
            }
            used += costs[i];
            keep_from = i;
        }

        // Too little context survived: force-keep a fixed tail over budget
        if tail.len() - keep_from < self.config.min_recent_units {
            let forced = tail.len().saturating_sub(self.config.forced_tail_units);
            if forced < keep_from {
                warn!(
                    forced_tail = self.config.forced_tail_units,
                    "truncate_if_needed: budget too small for minimum context, force-keeping tail"
                );
                keep_from = forced;
            }
        }

        let mut out: Vec<ChatMessage> = head.into_iter().flatten().collect();
        out.push(recovery);
        out.extend(tail.into_iter().skip(keep_from).flatten());

        let stats = Self::validate_and_repair(&mut out);
        if !stats.is_clean() {
            warn!(
                orphans = stats.orphans_dropped,
                placeholders = stats.placeholders_added,
                "truncate_if_needed: repaired tool pairing after truncation"
            );
        }

        debug!(
            kept_messages = out.len(),
            estimate = self.estimate_tokens(&out),
            "truncate_if_needed: done"
        );

        *messages = out;
        true
    }

    /// Build the synthesized recovery unit
    fn recovery_unit(&self, tracker: &ProgressTracker, chunk_size: u64) -> ChatMessage {
        ChatMessage::user(format!(
            "[Earlier conversation removed to fit the context budget.]\n\n{}\n\n\
             Call get_progress to confirm the current state, then continue \
             reading from the next unread chunk. Do not re-read lines that \
             are already marked as read.",
            tracker.recovery_summary(chunk_size)
        ))
    }

    /// Enforce the tool pairing invariant on an arbitrary message sequence
    ///
    /// Single forward pass with a pending-id set: orphan tool results are
    /// dropped; before any non-tool-result message while ids remain pending
    /// (and at end of conversation), placeholder results are synthesized for
    /// every missing id. The output always satisfies the conversation unit
    /// invariant, whatever the input looked like.
    pub fn validate_and_repair(messages: &mut Vec<ChatMessage>) -> RepairStats {
        let mut stats = RepairStats::default();
        let mut out: Vec<ChatMessage> = Vec::with_capacity(messages.len());
        let mut pending: Vec<String> = Vec::new();

        for msg in messages.drain(..) {
            if let Some(call_id) = msg.answered_call_id() {
                match pending.iter().position(|p| p == call_id) {
                    Some(pos) => {
                        pending.remove(pos);
                        out.push(msg);
                    }
                    None => {
                        warn!(call_id, "validate_and_repair: dropping orphan tool result");
                        stats.orphans_dropped += 1;
                    }
                }
                continue;
            }

            // Non-tool-result while calls are still pending: answer them first
            for id in pending.drain(..) {
                warn!(call_id = %id, "validate_and_repair: synthesizing placeholder tool result");
                out.push(ChatMessage::tool_result(id, TRUNCATED_RESULT));
                stats.placeholders_added += 1;
            }

            let newly_pending: Vec<String> = msg
                .pending_call_ids()
                .map(|ids| ids.into_iter().map(str::to_string).collect())
                .unwrap_or_default();
            out.push(msg);
            pending = newly_pending;
        }

        for id in pending.drain(..) {
            warn!(call_id = %id, "validate_and_repair: synthesizing placeholder at end of conversation");
            out.push(ChatMessage::tool_result(id, TRUNCATED_RESULT));
            stats.placeholders_added += 1;
        }

        *messages = out;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCallRequest;

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_string(),
            name: "read_lines".to_string(),
            arguments: serde_json::json!({"start_line": 1, "end_line": 100}),
        }
    }

    fn tool_pair(id: &str) -> Vec<ChatMessage> {
        // 400 chars of payload = 100 estimated tokens per result
        vec![
            ChatMessage::assistant_tool_calls(None, vec![call(id)]),
            ChatMessage::tool_result(id, "x".repeat(400)),
        ]
    }

    fn base_conversation(pairs: usize) -> Vec<ChatMessage> {
        let mut messages = vec![
            ChatMessage::system("You are a document analyst."),
            ChatMessage::user("Summarize the report."),
        ];
        for i in 0..pairs {
            messages.extend(tool_pair(&format!("call_{i}")));
        }
        messages
    }

    fn manager(budget: usize) -> ContextManager {
        ContextManager::new(ContextConfig {
            token_budget: budget,
            chars_per_token: 4.0,
            min_recent_units: 2,
            forced_tail_units: 2,
        })
    }

    #[test]
    fn test_group_singletons() {
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("task"),
            ChatMessage::assistant("reply"),
        ];

        let units = ContextManager::group_into_units(messages);
        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| u.len() == 1));
    }

    #[test]
    fn test_group_absorbs_matching_results() {
        let messages = vec![
            ChatMessage::assistant_tool_calls(None, vec![call("a"), call("b")]),
            ChatMessage::tool_result("a", "out a"),
            ChatMessage::tool_result("b", "out b"),
            ChatMessage::user("next"),
        ];

        let units = ContextManager::group_into_units(messages);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].len(), 3);
        assert_eq!(units[1].len(), 1);
    }

    #[test]
    fn test_group_stops_at_unmatched_result() {
        let messages = vec![
            ChatMessage::assistant_tool_calls(None, vec![call("a")]),
            ChatMessage::tool_result("other", "not ours"),
        ];

        let units = ContextManager::group_into_units(messages);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].len(), 1);
    }

    #[test]
    fn test_estimate_tokens_uses_ratio() {
        let mgr = manager(1000);
        let messages = vec![ChatMessage::user("x".repeat(400))];
        assert_eq!(mgr.estimate_tokens(&messages), 100);
    }

    #[test]
    fn test_truncate_noop_under_budget() {
        let mgr = manager(1_000_000);
        let tracker = ProgressTracker::new(100);
        let mut messages = base_conversation(3);
        let before = messages.clone();

        let truncated = mgr.truncate_if_needed(&mut messages, &tracker, 50);

        assert!(!truncated);
        assert_eq!(messages, before);
    }

    #[test]
    fn test_truncate_keeps_first_two_units_verbatim() {
        let mgr = manager(600);
        let mut tracker = ProgressTracker::new(1000);
        tracker.mark_read(1, 400);

        let mut messages = base_conversation(10);
        let system = messages[0].clone();
        let task = messages[1].clone();

        let truncated = mgr.truncate_if_needed(&mut messages, &tracker, 300);

        assert!(truncated);
        assert_eq!(messages[0], system);
        assert_eq!(messages[1], task);
        // Recovery unit follows the preserved head
        match &messages[2] {
            ChatMessage::User { content } => {
                assert!(content.contains("40.0%"));
                assert!(content.contains("get_progress"));
            }
            other => panic!("expected recovery user message, got {other:?}"),
        }
    }

    #[test]
    fn test_truncate_fits_budget_and_keeps_newest() {
        let mgr = manager(600);
        let tracker = ProgressTracker::new(1000);
        let mut messages = base_conversation(10);

        mgr.truncate_if_needed(&mut messages, &tracker, 300);

        assert!(mgr.estimate_tokens(&messages) <= 600);
        // The newest pair must have survived
        assert!(messages.iter().any(|m| m.answered_call_id() == Some("call_9")));
        // The oldest pair must not
        assert!(!messages.iter().any(|m| m.answered_call_id() == Some("call_0")));
    }

    #[test]
    fn test_truncate_forces_tail_when_budget_tiny() {
        // Budget too small for anything but head+recovery: the forced tail
        // must still keep the most recent units.
        let mgr = ContextManager::new(ContextConfig {
            token_budget: 10,
            chars_per_token: 4.0,
            min_recent_units: 2,
            forced_tail_units: 2,
        });
        let tracker = ProgressTracker::new(100);
        let mut messages = base_conversation(8);

        mgr.truncate_if_needed(&mut messages, &tracker, 50);

        assert!(messages.iter().any(|m| m.answered_call_id() == Some("call_7")));
        assert!(messages.iter().any(|m| m.answered_call_id() == Some("call_6")));
        assert!(!messages.iter().any(|m| m.answered_call_id() == Some("call_0")));
    }

    #[test]
    fn test_truncated_output_has_valid_pairing() {
        let mgr = manager(400);
        let tracker = ProgressTracker::new(500);
        let mut messages = base_conversation(12);

        mgr.truncate_if_needed(&mut messages, &tracker, 100);

        // Repairing an already-repaired conversation must be a no-op
        let stats = ContextManager::validate_and_repair(&mut messages);
        assert!(stats.is_clean());
    }

    #[test]
    fn test_repair_drops_orphan_results() {
        let mut messages = vec![
            ChatMessage::user("hello"),
            ChatMessage::tool_result("ghost", "orphaned"),
            ChatMessage::assistant("hi"),
        ];

        let stats = ContextManager::validate_and_repair(&mut messages);

        assert_eq!(stats.orphans_dropped, 1);
        assert_eq!(stats.placeholders_added, 0);
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.answered_call_id().is_none()));
    }

    #[test]
    fn test_repair_inserts_placeholders_before_next_message() {
        let mut messages = vec![
            ChatMessage::assistant_tool_calls(None, vec![call("a"), call("b")]),
            ChatMessage::tool_result("a", "answered"),
            ChatMessage::user("moving on"),
        ];

        let stats = ContextManager::validate_and_repair(&mut messages);

        assert_eq!(stats.placeholders_added, 1);
        // Placeholder for "b" must come before the user message
        assert_eq!(messages[2], ChatMessage::tool_result("b", "(response truncated)"));
        assert!(matches!(messages[3], ChatMessage::User { .. }));
    }

    #[test]
    fn test_repair_flushes_pending_at_end() {
        let mut messages = vec![ChatMessage::assistant_tool_calls(None, vec![call("a")])];

        let stats = ContextManager::validate_and_repair(&mut messages);

        assert_eq!(stats.placeholders_added, 1);
        assert_eq!(messages[1], ChatMessage::tool_result("a", "(response truncated)"));
    }

    #[test]
    fn test_repair_clean_conversation_untouched() {
        let mut messages = base_conversation(3);
        let before = messages.clone();

        let stats = ContextManager::validate_and_repair(&mut messages);

        assert!(stats.is_clean());
        assert_eq!(messages, before);
    }
}

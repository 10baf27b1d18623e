// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Branch tree operations: fork, switch, truncate, branch-aware deletion.
//!
//! Only the active branch is ever appended to or truncated; branches are
//! immutable once superseded. After every operation `active_branch_id`
//! resolves to a real branch and the `messages()` view is that branch's
//! own message array.

use braid_core::ChatRole;
use chrono::Utc;
use uuid::Uuid;

use crate::types::{Branch, Conversation, StoredMessage};

impl Conversation {
    /// Creates a conversation with exactly one empty branch, which becomes
    /// active.
    pub fn new(title: impl Into<String>) -> Self {
        let branch = Branch::new(None);
        let active_branch_id = branch.id.clone();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: Utc::now(),
            branches: vec![branch],
            active_branch_id,
            is_temporary: false,
        }
    }

    /// Creates the ephemeral scratch conversation. Never persisted.
    pub fn new_temporary() -> Self {
        let mut conv = Self::new("New chat");
        conv.is_temporary = true;
        conv
    }

    fn active_branch_index(&self) -> usize {
        self.branches
            .iter()
            .position(|b| b.id == self.active_branch_id)
            // Stale active id falls back to the original branch.
            .unwrap_or(0)
    }

    /// The active branch. Falls back to the first branch if
    /// `active_branch_id` is stale.
    pub fn active_branch(&self) -> &Branch {
        &self.branches[self.active_branch_index()]
    }

    pub fn active_branch_mut(&mut self) -> &mut Branch {
        let idx = self.active_branch_index();
        &mut self.branches[idx]
    }

    /// The conversation's message view: the active branch's own message
    /// array, not a copy.
    pub fn messages(&self) -> &[StoredMessage] {
        &self.active_branch().messages
    }

    /// Appends a message to the active branch.
    pub fn append_message(&mut self, message: StoredMessage) {
        self.active_branch_mut().messages.push(message);
    }

    /// Copies the active branch's messages up to `truncate_at` (exclusive)
    /// into a new branch, optionally appends `replacement_tail`, records the
    /// fork point, and makes the new branch active.
    ///
    /// Copied messages keep their ids; `replacement_tail` is used by
    /// "edit a user message" to supply the replacement turn. "Regenerate"
    /// passes no tail and truncates to just after the triggering user
    /// message.
    pub fn fork_and_switch(
        &mut self,
        truncate_at: usize,
        forked_from: usize,
        replacement_tail: Option<StoredMessage>,
    ) -> &Branch {
        let source = self.active_branch();
        let cut = truncate_at.min(source.messages.len());

        let mut branch = Branch::new(Some(forked_from));
        branch.messages = source.messages[..cut].to_vec();
        if let Some(tail) = replacement_tail {
            branch.messages.push(tail);
        }

        self.active_branch_id = branch.id.clone();
        self.branches.push(branch);
        self.active_branch()
    }

    /// Makes `branch_id` active. No-op when the id names no branch.
    pub fn switch_active_branch(&mut self, branch_id: &str) {
        if self.branches.iter().any(|b| b.id == branch_id) {
            self.active_branch_id = branch_id.to_string();
        }
    }

    /// Every branch containing a user message with `message_id`, in
    /// creation order. Drives "variant i of n" navigation and the deletion
    /// rule below.
    pub fn branches_for_user_message(&self, message_id: &str) -> Vec<&Branch> {
        self.branches
            .iter()
            .filter(|b| b.contains_user_message(message_id))
            .collect()
    }

    /// Deletes the user message at `user_message_index` in the active
    /// branch, and everything after it, with branch-aware semantics.
    ///
    /// When the message's id appears in more than one branch, only the
    /// active branch (this variant of the turn) is removed and the active
    /// branch switches to the nearest older remaining branch still
    /// containing the id (failing that, a newer one; failing that, any
    /// remaining branch). When the id appears in exactly one branch, that
    /// branch is truncated in place.
    pub fn delete_from_index(&mut self, user_message_index: usize) {
        let Some(message) = self.messages().get(user_message_index) else {
            return;
        };
        if message.role != ChatRole::User {
            return;
        }
        let message_id = message.id.clone();

        let containing = self.branches_for_user_message(&message_id).len();

        if containing > 1 {
            let removed_idx = self.active_branch_index();
            self.branches.remove(removed_idx);

            // Nearest older branch still containing the id, then newer ones,
            // then any remaining branch. Vector order is creation order.
            let fallback = self
                .branches
                .iter()
                .enumerate()
                .filter(|(_, b)| b.contains_user_message(&message_id))
                .map(|(i, b)| (i, b.id.clone()))
                .min_by_key(|(i, _)| {
                    if *i < removed_idx {
                        // Older branches ordered by proximity to the removed one.
                        removed_idx - *i
                    } else {
                        // Newer branches rank after every older one.
                        removed_idx + (*i - removed_idx) + self.branches.len()
                    }
                })
                .map(|(_, id)| id)
                .or_else(|| self.branches.first().map(|b| b.id.clone()));

            if let Some(next) = fallback {
                self.active_branch_id = next;
            }
        } else {
            self.active_branch_mut().messages.truncate(user_message_index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation_with_turns(turns: &[(&str, &str)]) -> Conversation {
        let mut conv = Conversation::new("test");
        for (user, assistant) in turns {
            conv.append_message(StoredMessage::user(*user));
            conv.append_message(StoredMessage::assistant(*assistant));
        }
        conv
    }

    #[test]
    fn new_conversation_has_one_empty_active_branch() {
        let conv = Conversation::new("hello");
        assert_eq!(conv.branches.len(), 1);
        assert_eq!(conv.active_branch_id, conv.branches[0].id);
        assert!(conv.messages().is_empty());
        assert_eq!(conv.branches[0].forked_from_user_message_index, None);
    }

    #[test]
    fn append_lands_in_active_branch_only() {
        let mut conv = conversation_with_turns(&[("q1", "a1")]);
        conv.fork_and_switch(1, 0, None);
        conv.append_message(StoredMessage::assistant("a1-regen"));

        assert_eq!(conv.branches[0].messages.len(), 2);
        assert_eq!(conv.messages().len(), 2);
        assert_eq!(conv.messages()[1].content, "a1-regen");
    }

    #[test]
    fn fork_copies_prefix_and_preserves_message_ids() {
        let mut conv = conversation_with_turns(&[("q1", "a1"), ("q2", "a2")]);
        let original_ids: Vec<String> =
            conv.messages().iter().map(|m| m.id.clone()).collect();

        // Edit the second user message (index 2): fork before it with a
        // replacement tail.
        let branch = conv.fork_and_switch(2, 2, Some(StoredMessage::user("q2-edited")));
        assert_eq!(branch.forked_from_user_message_index, Some(2));

        let messages = conv.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].id, original_ids[0]);
        assert_eq!(messages[1].id, original_ids[1]);
        assert_eq!(messages[2].content, "q2-edited");
        assert_ne!(messages[2].id, original_ids[2]);

        // Source branch untouched.
        assert_eq!(conv.branches[0].messages.len(), 4);
    }

    #[test]
    fn fork_for_regenerate_truncates_after_user_message() {
        let mut conv = conversation_with_turns(&[("q1", "a1")]);
        // Regenerate a1: keep q1, drop the assistant reply.
        let branch = conv.fork_and_switch(1, 0, None);
        assert_eq!(branch.messages.len(), 1);
        assert_eq!(branch.messages[0].content, "q1");
        assert_eq!(branch.forked_from_user_message_index, Some(0));
    }

    #[test]
    fn switch_active_branch_is_noop_for_unknown_id() {
        let mut conv = conversation_with_turns(&[("q1", "a1")]);
        let active = conv.active_branch_id.clone();
        conv.switch_active_branch("no-such-branch");
        assert_eq!(conv.active_branch_id, active);
    }

    #[test]
    fn switched_view_is_the_target_branch_array() {
        let mut conv = conversation_with_turns(&[("q1", "a1")]);
        let original = conv.branches[0].id.clone();
        conv.fork_and_switch(1, 0, None);

        conv.switch_active_branch(&original);
        assert_eq!(conv.active_branch_id, original);
        let view_ptr = conv.messages().as_ptr();
        let branch_ptr = conv.branches[0].messages.as_ptr();
        assert!(std::ptr::eq(view_ptr, branch_ptr));
    }

    #[test]
    fn stale_active_id_falls_back_to_first_branch() {
        let mut conv = conversation_with_turns(&[("q1", "a1")]);
        conv.active_branch_id = "dangling".to_string();
        assert_eq!(conv.active_branch().id, conv.branches[0].id);
    }

    #[test]
    fn branches_for_user_message_in_creation_order() {
        let mut conv = conversation_with_turns(&[("q1", "a1"), ("q2", "a2")]);
        let q2_id = conv.messages()[2].id.clone();

        // Two regenerations of a2 produce two more branches containing q2.
        conv.fork_and_switch(3, 2, None);
        conv.fork_and_switch(3, 2, None);

        let variants = conv.branches_for_user_message(&q2_id);
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].id, conv.branches[0].id);
        assert_eq!(variants[2].id, conv.branches[2].id);
    }

    #[test]
    fn delete_in_single_branch_truncates_in_place() {
        let mut conv = conversation_with_turns(&[("q1", "a1"), ("q2", "a2")]);
        conv.delete_from_index(2);

        assert_eq!(conv.branches.len(), 1);
        assert_eq!(conv.messages().len(), 2);
        assert_eq!(conv.messages()[1].content, "a1");
    }

    #[test]
    fn delete_with_variants_removes_only_active_branch() {
        let mut conv = conversation_with_turns(&[("q1", "a1")]);
        let q1_id = conv.messages()[0].id.clone();
        let original = conv.branches[0].id.clone();

        // Regenerate a1 -- q1 now exists in two branches.
        conv.fork_and_switch(1, 0, None);
        conv.append_message(StoredMessage::assistant("a1-v2"));
        assert_eq!(conv.branches.len(), 2);

        conv.delete_from_index(0);

        // Only the active variant was destroyed; the original survives and
        // becomes active, still containing q1.
        assert_eq!(conv.branches.len(), 1);
        assert_eq!(conv.active_branch_id, original);
        assert!(conv.active_branch().contains_user_message(&q1_id));
        assert_eq!(conv.messages().len(), 2);
    }

    #[test]
    fn delete_with_variants_prefers_nearest_older_branch() {
        let mut conv = conversation_with_turns(&[("q1", "a1")]);

        conv.fork_and_switch(1, 0, None); // branch 1
        conv.append_message(StoredMessage::assistant("a1-v2"));
        conv.fork_and_switch(1, 0, None); // branch 2 (active)
        conv.append_message(StoredMessage::assistant("a1-v3"));
        let middle = conv.branches[1].id.clone();

        conv.delete_from_index(0);
        assert_eq!(conv.active_branch_id, middle);
    }

    #[test]
    fn delete_ignores_non_user_index() {
        let mut conv = conversation_with_turns(&[("q1", "a1")]);
        conv.delete_from_index(1); // assistant message
        assert_eq!(conv.messages().len(), 2);
    }

    #[test]
    fn delete_ignores_out_of_range_index() {
        let mut conv = conversation_with_turns(&[("q1", "a1")]);
        conv.delete_from_index(99);
        assert_eq!(conv.messages().len(), 2);
    }

    #[test]
    fn every_operation_leaves_a_resolvable_active_branch() {
        let mut conv = conversation_with_turns(&[("q1", "a1"), ("q2", "a2")]);
        conv.fork_and_switch(3, 2, None);
        conv.append_message(StoredMessage::assistant("a2-v2"));
        conv.delete_from_index(2);
        assert!(conv.branches.iter().any(|b| b.id == conv.active_branch_id));

        conv.delete_from_index(0);
        assert!(conv.branches.iter().any(|b| b.id == conv.active_branch_id));
        assert!(!conv.branches.is_empty());
    }
}

#![forbid(unsafe_code)]

//! Transaction boundary for batches of dock mutations.
//!
//! A [`DockTransaction`] stages mutations on a working copy and journals every
//! attempt, rejected ones included. `commit` keeps the working tree,
//! `rollback` hands back the base tree untouched.

use serde::{Deserialize, Serialize};

use crate::id::{NodeId, WindowId};
use crate::mutation::{DockMutation, DockMutationKind, MutationError, MutationOutcome};
use crate::tree::DockTree;

/// One journal row emitted by a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockJournalEntry {
    pub transaction_id: u64,
    pub sequence: u64,
    pub mutation: DockMutation,
    pub kind: DockMutationKind,
    pub touched_nodes: Vec<NodeId>,
    #[serde(default)]
    pub opened_windows: Vec<WindowId>,
    #[serde(default)]
    pub closed_windows: Vec<WindowId>,
    pub before_hash: u64,
    pub after_hash: u64,
    pub result: DockJournalResult,
}

/// Result state of one attempted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DockJournalResult {
    Applied,
    Rejected { reason: String },
}

/// Finalized payload of `commit` / `rollback`.
#[derive(Debug, Clone, PartialEq)]
pub struct DockTransactionOutcome {
    pub transaction_id: u64,
    pub committed: bool,
    pub tree: DockTree,
    pub journal: Vec<DockJournalEntry>,
}

impl DockTransactionOutcome {
    /// Entries that changed the tree, in order.
    pub fn applied(&self) -> impl Iterator<Item = &DockJournalEntry> {
        self.journal
            .iter()
            .filter(|entry| entry.result == DockJournalResult::Applied)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockTransaction {
    transaction_id: u64,
    sequence: u64,
    base_tree: DockTree,
    working_tree: DockTree,
    journal: Vec<DockJournalEntry>,
}

impl DockTransaction {
    fn new(transaction_id: u64, base_tree: DockTree) -> Self {
        Self {
            transaction_id,
            sequence: 1,
            base_tree: base_tree.clone(),
            working_tree: base_tree,
            journal: Vec::new(),
        }
    }

    #[must_use]
    pub const fn transaction_id(&self) -> u64 {
        self.transaction_id
    }

    /// Working tree for read-only inspection.
    #[must_use]
    pub fn tree(&self) -> &DockTree {
        &self.working_tree
    }

    #[must_use]
    pub fn journal(&self) -> &[DockJournalEntry] {
        &self.journal
    }

    /// Attempt one mutation against the working tree. Every attempt is
    /// journaled.
    pub fn apply(&mut self, mutation: DockMutation) -> Result<MutationOutcome, MutationError> {
        let journaled = mutation.clone();
        let kind = journaled.kind();
        let sequence = self.next_sequence();

        match self.working_tree.apply(mutation) {
            Ok(outcome) => {
                self.journal.push(DockJournalEntry {
                    transaction_id: self.transaction_id,
                    sequence,
                    mutation: journaled,
                    kind,
                    touched_nodes: outcome.touched_nodes.clone(),
                    opened_windows: outcome.opened_windows.clone(),
                    closed_windows: outcome.closed_windows.clone(),
                    before_hash: outcome.before_hash,
                    after_hash: outcome.after_hash,
                    result: DockJournalResult::Applied,
                });
                Ok(outcome)
            }
            Err(err) => {
                self.journal.push(DockJournalEntry {
                    transaction_id: self.transaction_id,
                    sequence,
                    mutation: journaled,
                    kind,
                    touched_nodes: err.touched_nodes.clone(),
                    opened_windows: Vec::new(),
                    closed_windows: Vec::new(),
                    before_hash: err.before_hash,
                    after_hash: err.after_hash,
                    result: DockJournalResult::Rejected {
                        reason: err.reason.to_string(),
                    },
                });
                Err(err)
            }
        }
    }

    /// Keep all successful mutations.
    #[must_use]
    pub fn commit(self) -> DockTransactionOutcome {
        DockTransactionOutcome {
            transaction_id: self.transaction_id,
            committed: true,
            tree: self.working_tree,
            journal: self.journal,
        }
    }

    /// Discard all mutations.
    #[must_use]
    pub fn rollback(self) -> DockTransactionOutcome {
        DockTransactionOutcome {
            transaction_id: self.transaction_id,
            committed: false,
            tree: self.base_tree,
            journal: self.journal,
        }
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence = self.sequence;
        self.sequence = self.sequence.saturating_add(1);
        sequence
    }
}

impl DockTree {
    /// Start a transaction staged on a clone of this tree.
    #[must_use]
    pub fn begin_transaction(&self, transaction_id: u64) -> DockTransaction {
        DockTransaction::new(transaction_id, self.clone())
    }

    /// Re-apply the applied rows of `journal` on a copy of this tree.
    ///
    /// Rejected rows are skipped. Applying the same journal to the same
    /// starting tree always yields the same state hash.
    pub fn replay<'a>(
        &self,
        journal: impl IntoIterator<Item = &'a DockJournalEntry>,
    ) -> Result<DockTree, MutationError> {
        let mut tree = self.clone();
        for entry in journal {
            if entry.result == DockJournalResult::Applied {
                tree.apply(entry.mutation.clone())?;
            }
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Orientation;
    use crate::mutation::MutationFailure;

    fn seeded() -> (DockTree, NodeId) {
        let mut tree = DockTree::new("root");
        let root = tree.main_root();
        let docs = tree.create_document_dock("docs").expect("alloc");
        tree.add_dockable(root, docs).expect("docs");
        (tree, docs)
    }

    #[test]
    fn rejected_mutations_are_journaled_and_leave_tree_unchanged() {
        let (mut tree, docs) = seeded();
        let doc = tree.create_document("d", "D").expect("alloc");
        let mut tx = tree.begin_transaction(7);
        let before = tx.tree().state_hash();

        let err = tx
            .apply(DockMutation::RemoveDockable {
                dockable: doc,
                collapse: true,
            })
            .expect_err("detached");
        assert_eq!(err.reason, MutationFailure::Detached { node_id: doc });
        assert_eq!(tx.tree().state_hash(), before);

        tx.apply(DockMutation::AddDockable {
            dock: docs,
            dockable: doc,
        })
        .expect("add");

        let journal = tx.journal();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].sequence, 1);
        assert_eq!(journal[0].transaction_id, 7);
        assert!(matches!(
            journal[0].result,
            DockJournalResult::Rejected { .. }
        ));
        assert_eq!(journal[0].before_hash, journal[0].after_hash);
        assert_eq!(journal[1].sequence, 2);
        assert_eq!(journal[1].result, DockJournalResult::Applied);
        assert_ne!(journal[1].before_hash, journal[1].after_hash);
    }

    #[test]
    fn rollback_restores_base_and_commit_keeps_work() {
        let (mut tree, docs) = seeded();
        let doc = tree.create_document("d", "D").expect("alloc");
        let base_hash = tree.state_hash();

        let mut tx = tree.begin_transaction(1);
        tx.apply(DockMutation::AddDockable {
            dock: docs,
            dockable: doc,
        })
        .expect("add");
        let rolled = tx.rollback();
        assert!(!rolled.committed);
        assert_eq!(rolled.tree.state_hash(), base_hash);
        assert_eq!(rolled.journal.len(), 1);

        let mut tx = tree.begin_transaction(2);
        tx.apply(DockMutation::AddDockable {
            dock: docs,
            dockable: doc,
        })
        .expect("add");
        let committed = tx.commit();
        assert!(committed.committed);
        assert_eq!(committed.tree.content_children(docs), vec![doc]);
        assert_eq!(committed.applied().count(), 1);
    }

    #[test]
    fn replay_reproduces_state_hash() {
        let mut tree = DockTree::new("root");
        let root = tree.main_root();
        let layout = tree
            .create_proportional_dock("layout", Orientation::Horizontal)
            .expect("alloc");
        let left = tree.create_document_dock("left").expect("alloc");
        let doc = tree.create_document("d", "D").expect("alloc");
        let base = tree.clone();

        let mut tx = tree.begin_transaction(3);
        for mutation in [
            DockMutation::AddDockable {
                dock: root,
                dockable: layout,
            },
            DockMutation::AddDockable {
                dock: layout,
                dockable: left,
            },
            DockMutation::AddDockable {
                dock: left,
                dockable: left,
            },
            DockMutation::AddDockable {
                dock: left,
                dockable: doc,
            },
        ] {
            let _ = tx.apply(mutation);
        }
        let outcome = tx.commit();
        let replayed = base.replay(&outcome.journal).expect("replay");
        assert_eq!(replayed.state_hash(), outcome.tree.state_hash());
        assert_eq!(replayed.content_children(left), vec![doc]);
    }

    #[test]
    fn journal_round_trips_through_json() {
        let (mut tree, docs) = seeded();
        let doc = tree.create_document("d", "D").expect("alloc");
        let mut tx = tree.begin_transaction(9);
        tx.apply(DockMutation::AddDockable {
            dock: docs,
            dockable: doc,
        })
        .expect("add");
        tx.apply(DockMutation::SetProportion {
            dockable: doc,
            proportion: f64::NAN,
        })
        .expect("nan proportion");
        let json = serde_json::to_string(tx.journal()).expect("serialize");
        assert!(json.contains("\"status\":\"applied\""));
        assert!(json.contains("\"op\":\"set_proportion\""));
        let back: Vec<DockJournalEntry> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.len(), 2);
        assert_eq!(back[0], tx.journal()[0]);
        assert!(matches!(
            back[1].mutation,
            DockMutation::SetProportion { proportion, .. } if proportion.is_nan()
        ));
    }
}

// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::dom::{MutationKind, MutationRecord};

use super::context::PageContext;

/// Upper bound on engine rounds per pump. The engines are idempotent, so a
/// healthy page settles after two or three.
pub const DEFAULT_MAX_ROUNDS: usize = 16;

/// Drains the document's mutation queue and reruns the engines until the
/// page stops changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationLoop {
    observe_character_data: bool,
    max_rounds: usize,
}

impl ObservationLoop {
    pub fn new(observe_character_data: bool) -> Self {
        Self {
            observe_character_data,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn is_relevant(&self, records: &[MutationRecord]) -> bool {
        records.iter().any(|record| match record.kind {
            MutationKind::ChildList => true,
            MutationKind::CharacterData => self.observe_character_data,
            MutationKind::Attributes => false,
        })
    }

    /// Returns the number of engine rounds that ran.
    pub fn pump(&self, context: &PageContext) -> usize {
        let mut rounds = 0;
        loop {
            if rounds == self.max_rounds {
                let pending = context
                    .with_document(|document| self.is_relevant(document.pending_mutations()));
                if pending {
                    log::warn!(
                        "VisualFix: page still changing after {} rounds, waiting for the next mutation",
                        rounds
                    );
                }
                return rounds;
            }
            let records = context.with_document(|document| document.take_mutations());
            if !self.is_relevant(&records) {
                return rounds;
            }
            context.run_engines();
            rounds += 1;
        }
    }
}

// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::collections::BTreeSet;

use super::session::Caller;

/// Entity restriction of a caller.
///
/// A record is visible when it belongs to one of the caller's active
/// entities, or when it is shared recursively from one of their ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityScope {
    entities: BTreeSet<u64>,
    ancestors: BTreeSet<u64>,
}

impl EntityScope {
    pub fn new(
        entities: impl IntoIterator<Item = u64>,
        ancestors: impl IntoIterator<Item = u64>,
    ) -> Self {
        Self {
            entities: entities.into_iter().collect(),
            ancestors: ancestors.into_iter().collect(),
        }
    }

    pub fn for_caller(caller: &Caller) -> Self {
        Self::new(
            caller.entities.iter().copied(),
            caller.ancestors.iter().copied(),
        )
    }

    pub fn admits(&self, entities_id: u64, is_recursive: bool) -> bool {
        self.entities.contains(&entities_id)
            || (is_recursive && self.ancestors.contains(&entities_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_entities_are_always_visible() {
        let scope = EntityScope::new([3, 4], [0, 1]);
        assert!(scope.admits(3, false));
        assert!(scope.admits(4, true));
    }

    #[test]
    fn ancestors_only_share_recursive_records() {
        let scope = EntityScope::new([3], [0, 1]);
        assert!(scope.admits(0, true));
        assert!(!scope.admits(0, false));
        assert!(!scope.admits(7, true));
    }

    #[test]
    fn empty_scope_admits_nothing() {
        assert!(!EntityScope::default().admits(0, true));
    }
}

//! Category parent-chain checks.

use std::collections::{HashMap, HashSet};

use crate::CategoryId;

/// Whether making `new_parent` the parent of `category` would close a loop.
///
/// `parents` maps every category in the store to its current parent. The walk
/// starts at `new_parent` and follows parent links upward; reaching `category`
/// means `new_parent` is the category itself or one of its descendants.
///
/// A pre-existing loop that does not involve `category` stops the walk and
/// is not reported.
#[must_use]
pub fn creates_cycle<S>(
    category: CategoryId,
    new_parent: CategoryId,
    parents: &HashMap<CategoryId, Option<CategoryId>, S>,
) -> bool
where
    S: std::hash::BuildHasher,
{
    let mut seen = HashSet::new();
    let mut cursor = Some(new_parent);

    while let Some(current) = cursor {
        if current == category {
            return true;
        }
        if !seen.insert(current) {
            return false;
        }
        cursor = parents.get(&current).copied().flatten();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root <- child <- grandchild, plus an unrelated `other`.
    fn tree() -> (
        [CategoryId; 4],
        HashMap<CategoryId, Option<CategoryId>>,
    ) {
        let ids = [
            CategoryId::new(),
            CategoryId::new(),
            CategoryId::new(),
            CategoryId::new(),
        ];
        let [root, child, grandchild, other] = ids;
        let parents = HashMap::from([
            (root, None),
            (child, Some(root)),
            (grandchild, Some(child)),
            (other, None),
        ]);
        (ids, parents)
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let ([root, ..], parents) = tree();
        assert!(creates_cycle(root, root, &parents));
    }

    #[test]
    fn test_descendant_parent_is_cycle() {
        let ([root, child, grandchild, _], parents) = tree();
        assert!(creates_cycle(root, grandchild, &parents));
        assert!(creates_cycle(child, grandchild, &parents));
    }

    #[test]
    fn test_moving_down_a_branch_is_fine() {
        let ([root, child, grandchild, other], parents) = tree();
        assert!(!creates_cycle(grandchild, root, &parents));
        assert!(!creates_cycle(child, other, &parents));
        assert!(!creates_cycle(other, grandchild, &parents));
    }

    #[test]
    fn test_existing_loop_terminates() {
        let (a, b, c) = (CategoryId::new(), CategoryId::new(), CategoryId::new());
        let parents = HashMap::from([(a, Some(b)), (b, Some(a)), (c, None)]);
        assert!(!creates_cycle(c, a, &parents));
    }
}

//! Dependency resolution between actions of a rule and between rules of a ruleset.
//!
//! An item depends on another when one of its source expressions carries a
//! `${field}` token naming a field the other item writes. The same
//! algorithm runs at both scopes:
//!
//! ```text
//! dependent()      items that depend on some other item
//!      │
//! circular()       repeatedly drop items whose dependencies are all outside
//!      │           the remaining set; what is left can never be satisfied
//!      │
//! reorder()        stable placement: move each dependency right before the
//!                  first item that needs it
//! ```
//!
//! Results are fresh copies; inputs are never mutated.

pub mod interpolation;
mod scope;

pub use scope::{
    action_depends_on, resolve_actions, resolve_rules, rule_depends_on, rule_dependency_fields,
};

/// Dependency analysis over a slice, addressed by index.
///
/// `depends_on(a, b)` answers whether `a` reads something `b` writes.
/// An item is never considered to depend on itself.
pub struct DependencyGraph<'a, T, F>
where
    F: Fn(&T, &T) -> bool,
{
    items: &'a [T],
    depends_on: F,
}

impl<'a, T, F> DependencyGraph<'a, T, F>
where
    F: Fn(&T, &T) -> bool,
{
    pub fn new(items: &'a [T], depends_on: F) -> Self {
        Self { items, depends_on }
    }

    /// Whether `item` depends on another member of `candidates`.
    pub fn has_dependency(&self, item: usize, candidates: &[usize]) -> bool {
        candidates
            .iter()
            .any(|&other| other != item && (self.depends_on)(&self.items[item], &self.items[other]))
    }

    /// Direct dependencies of `item`, in slice order.
    pub fn dependencies_of(&self, item: usize) -> Vec<usize> {
        (0..self.items.len())
            .filter(|&other| other != item && (self.depends_on)(&self.items[item], &self.items[other]))
            .collect()
    }

    /// Items depending on some other item of the full set.
    pub fn dependent(&self) -> Vec<usize> {
        let all: Vec<usize> = (0..self.items.len()).collect();
        all.iter()
            .copied()
            .filter(|&i| self.has_dependency(i, &all))
            .collect()
    }

    /// The non-resolvable subset of `dependent`, in input order.
    ///
    /// Terminates because every round either shrinks the set or stops.
    pub fn circular(&self, dependent: &[usize]) -> Vec<usize> {
        let mut remaining = dependent.to_vec();
        loop {
            let resolvable: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&i| !self.has_dependency(i, &remaining))
                .collect();
            if resolvable.is_empty() {
                return remaining;
            }
            remaining.retain(|i| !resolvable.contains(i));
        }
    }

    /// `circular(dependent())`.
    pub fn unresolvable(&self) -> Vec<usize> {
        self.circular(&self.dependent())
    }

    /// Stable dependency-respecting order, as indices into the slice.
    pub fn reorder(&self) -> Vec<usize> {
        let mut ordered: Vec<usize> = (0..self.items.len()).collect();
        for item in 0..self.items.len() {
            for dependency in self.dependencies_of(item) {
                let Some(item_pos) = position(&ordered, item) else { continue };
                let Some(dep_pos) = position(&ordered, dependency) else { continue };
                if dep_pos > item_pos {
                    ordered.remove(dep_pos);
                    ordered.insert(item_pos, dependency);
                }
            }
        }
        ordered
    }
}

fn position(ordered: &[usize], value: usize) -> Option<usize> {
    ordered.iter().position(|&v| v == value)
}

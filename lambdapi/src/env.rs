//! Environments and variables.
//!
//! # Variables
//!
//! Bound variables in [terms][crate::core::Inferable] are [de Bruijn
//! indices][Index]. Variables introduced while checking or reading back a term
//! are identified by the [binder depth][Level] at which they were introduced,
//! so that they keep their identity no matter how many binders are crossed
//! afterwards.
//!
//! # Environments
//!
//! The elaborator and printer keep a [`UniqueEnv`] of names that is pushed and
//! popped as binders are entered and left. Evaluation captures environments in
//! closures, so it uses a persistent [`SharedEnv`] that can be cloned cheaply
//! and extended without disturbing other references to it.

use std::fmt;

/// Underlying variable representation.
type RawVar = u32;

/// A [de Bruijn index], which represents a variable counting the number of
/// binders between a variable occurrence and the binder that introduced the
/// variable.
///
/// For example:
///
/// | Representation    | Example (S combinator)  |
/// | ----------------- | ----------------------- |
/// | Named             | `λx. λy. λz. x z (y z)` |
/// | de Bruijn indices | `λ_. λ_. λ_. 2 0 (1 0)` |
///
/// This allows terms to be compared for [alpha-equivalence] by comparing
/// their structure: `λx. x` and `λy. y` are both `λ 0`.
///
/// [de Bruijn index]: https://en.wikipedia.org/wiki/De_Bruijn_index
/// [alpha-equivalence]: https://ncatlab.org/nlab/show/alpha-equivalence
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Index(RawVar);

impl Index {
    /// The last variable to be bound in the environment.
    pub const fn last() -> Index {
        Index(0)
    }

    /// Returns the previously bound variable, relative to this one.
    pub const fn prev(self) -> Index {
        Index(self.0 + 1)
    }
}

impl From<Index> for usize {
    fn from(index: Index) -> usize {
        index.0 as usize
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({})", self.0)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A de Bruijn level, counting the binders between the start of the
/// environment and the binder that introduced the variable. This is also the
/// binder depth at which a fresh variable is introduced.
///
/// | Representation    | Example (S combinator)  |
/// | ----------------- | ----------------------- |
/// | Named             | `λx. λy. λz. x z (y z)` |
/// | de Bruijn levels  | `λ_. λ_. λ_. 0 2 (1 2)` |
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(RawVar);

impl Level {
    /// The level of the first variable bound in the environment.
    pub const fn first() -> Level {
        Level(0)
    }

    /// Returns the next bound variable, relative to this one.
    pub const fn next(self) -> Level {
        Level(self.0 + 1)
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level({})", self.0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The length of an environment, or equivalently the current binder depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EnvLen(RawVar);

impl EnvLen {
    /// Construct a new, empty environment.
    pub fn new() -> EnvLen {
        EnvLen(0)
    }

    /// Convert an index to a level in the current environment.
    pub fn index_to_level(self, index: Index) -> Option<Level> {
        Some(Level(self.0.checked_sub(index.0)?.checked_sub(1)?))
    }

    /// Convert a level to an index in the current environment.
    pub fn level_to_index(self, level: Level) -> Option<Index> {
        Some(Index(self.0.checked_sub(level.0)?.checked_sub(1)?))
    }

    /// The next level that will be bound in this environment.
    pub fn next_level(self) -> Level {
        Level(self.0)
    }

    /// The environment with one more entry.
    pub fn succ(self) -> EnvLen {
        EnvLen(self.0 + 1)
    }

    /// Push an entry onto the environment.
    pub fn push(&mut self) {
        self.0 += 1;
    }

    /// Pop an entry off the environment.
    pub fn pop(&mut self) {
        self.0 -= 1;
    }
}

impl Default for EnvLen {
    fn default() -> EnvLen {
        EnvLen::new()
    }
}

/// A uniquely owned environment.
#[derive(Debug, Clone)]
pub struct UniqueEnv<Entry> {
    entries: Vec<Entry>,
}

impl<Entry> UniqueEnv<Entry> {
    /// Construct a new, empty environment.
    pub fn new() -> UniqueEnv<Entry> {
        UniqueEnv {
            entries: Vec::new(),
        }
    }

    /// The length of the environment.
    pub fn len(&self) -> EnvLen {
        EnvLen(self.entries.len() as RawVar)
    }

    /// Push an entry onto the environment.
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Pop an entry off the environment.
    pub fn pop(&mut self) {
        self.entries.pop();
    }

    /// Lookup an entry in the environment using an index.
    pub fn get_index(&self, index: Index) -> Option<&Entry> {
        let level = self.len().index_to_level(index)?;
        self.entries.get(level.0 as usize)
    }

    /// Find the index of the most recently bound entry matching `predicate`.
    pub fn position(&self, mut predicate: impl FnMut(&Entry) -> bool) -> Option<Index> {
        let position = self.entries.iter().rev().position(|entry| predicate(entry))?;
        Some(Index(position as RawVar))
    }

    /// Iterate over the elements in the environment, least recently bound first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Entry> {
        self.entries.iter()
    }
}

impl<Entry> Default for UniqueEnv<Entry> {
    fn default() -> UniqueEnv<Entry> {
        UniqueEnv::new()
    }
}

/// A persistent environment with structural sharing.
#[derive(Clone)]
pub struct SharedEnv<Entry> {
    entries: rpds::Vector<Entry>,
}

impl<Entry> SharedEnv<Entry> {
    /// Construct a new, empty environment.
    pub fn new() -> SharedEnv<Entry> {
        SharedEnv {
            entries: rpds::Vector::new(),
        }
    }

    /// The length of the environment.
    pub fn len(&self) -> EnvLen {
        EnvLen(self.entries.len() as RawVar)
    }

    /// Lookup an entry in the environment using a level.
    pub fn get_level(&self, level: Level) -> Option<&Entry> {
        self.entries.get(level.0 as usize)
    }

    /// Lookup an entry in the environment using an index.
    pub fn get_index(&self, index: Index) -> Option<&Entry> {
        self.get_level(self.len().index_to_level(index)?)
    }

    /// Push an entry onto the environment.
    pub fn push(&mut self, entry: Entry) {
        self.entries.push_back_mut(entry);
    }

    /// Pop an entry off the environment.
    pub fn pop(&mut self) {
        self.entries.drop_last_mut();
    }
}

impl<Entry> Default for SharedEnv<Entry> {
    fn default() -> SharedEnv<Entry> {
        SharedEnv::new()
    }
}

impl<Entry: fmt::Debug> fmt::Debug for SharedEnv<Entry> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_level_conversion() {
        let mut len = EnvLen::new();
        len.push();
        len.push();
        len.push();

        assert_eq!(len.index_to_level(Index::last()), Some(Level(2)));
        assert_eq!(len.level_to_index(Level::first()), Some(Index(2)));
        assert_eq!(len.level_to_index(Level(3)), None);
        assert_eq!(len.next_level(), Level(3));
    }

    #[test]
    fn shared_env_is_persistent() {
        let mut outer = SharedEnv::new();
        outer.push("x");
        let mut inner = outer.clone();
        inner.push("y");

        assert_eq!(outer.get_index(Index::last()), Some(&"x"));
        assert_eq!(inner.get_index(Index::last()), Some(&"y"));
        assert_eq!(inner.get_index(Index::last().prev()), Some(&"x"));
        assert_eq!(outer.len(), EnvLen(1));
    }

    #[test]
    fn unique_env_position_finds_innermost() {
        let mut names = UniqueEnv::new();
        names.push("x");
        names.push("y");
        names.push("x");

        assert_eq!(names.position(|name| *name == "x"), Some(Index(0)));
        assert_eq!(names.position(|name| *name == "y"), Some(Index(1)));
        assert_eq!(names.position(|name| *name == "z"), None);
    }
}

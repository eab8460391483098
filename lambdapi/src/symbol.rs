//! Interned identifiers.

use std::fmt;
use std::sync::RwLock;

use once_cell::sync::Lazy;

struct StringInterner {
    strings: lasso::ThreadedRodeo,
    alphabetic_names: Vec<Symbol>,
}

static INTERNER: Lazy<RwLock<StringInterner>> = Lazy::new(|| {
    RwLock::new(StringInterner {
        strings: lasso::ThreadedRodeo::new(),
        alphabetic_names: Vec::new(),
    })
});

impl StringInterner {
    /// Retrieve an alphabetic name based on a numeric count, interning all
    /// the names up to and including `index` if they are not already present.
    fn get_alphabetic_name(&mut self, index: usize) -> Symbol {
        let strings = &self.strings;
        let names = &mut self.alphabetic_names;
        names.extend(
            (names.len()..=index).map(|index| Symbol(strings.get_or_intern(alphabetic_name(index)))),
        );
        names[index]
    }
}

fn alphabetic_name(index: usize) -> String {
    let base = index / 26;
    let letter = index % 26;
    let letter = (letter as u8 + b'a') as char;
    if base == 0 {
        format!("{letter}")
    } else {
        format!("{letter}{base}")
    }
}

/// An interned string, cheap to copy and compare.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(lasso::Spur);

impl Symbol {
    pub fn intern(sym: impl AsRef<str>) -> Self {
        let interner = INTERNER.read().unwrap_or_else(|error| error.into_inner());
        Self(interner.strings.get_or_intern(sym))
    }

    pub fn intern_static(sym: &'static str) -> Self {
        let interner = INTERNER.read().unwrap_or_else(|error| error.into_inner());
        Self(interner.strings.get_or_intern_static(sym))
    }

    pub fn resolve<'a>(&'a self) -> &'a str {
        let interner = INTERNER.read().unwrap_or_else(|error| error.into_inner());
        let symbol = interner.strings.resolve(&self.0);

        // SAFETY: The lifetime is a bit of a lie: it is really tied to the lifetime of
        // `INTERNER`. But `INTERNER` is never dropped (since it is static), and
        // `ThreadedRodeo` never moves the strings it has allocated, so it is
        // safe to truncate the lifetime to the shorter lifetime of `'a`.
        unsafe { std::mem::transmute::<&str, &'a str>(symbol) }
    }

    /// Retrieve an alphabetic name based on a numeric count. This is useful for
    /// producing human-readable names for unnamed binders.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use lambdapi::symbol::Symbol;
    ///
    /// assert_eq!(Symbol::get_alphabetic_name(0), Symbol::intern("a"));
    /// // ...
    /// assert_eq!(Symbol::get_alphabetic_name(25), Symbol::intern("z"));
    /// assert_eq!(Symbol::get_alphabetic_name(26), Symbol::intern("a1"));
    /// ```
    pub fn get_alphabetic_name(index: usize) -> Symbol {
        let mut interner = INTERNER.write().unwrap_or_else(|error| error.into_inner());
        interner.get_alphabetic_name(index)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.resolve()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resolve())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resolve())
    }
}

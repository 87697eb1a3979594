//! Named, reusable sub-structures (`~o ~t ~s ~v ~u ~d`).

use serde::Serialize;

use crate::hmm::{Options, State, Transition, Vector};

// ---------------------------------------------------------------------------
// MacroKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MacroKind {
    Options,
    Transition,
    Variance,
    State,
    Mean,
    Duration,
}

impl MacroKind {
    /// The letter following `~` in HTK files.
    pub fn sigil(self) -> char {
        match self {
            MacroKind::Options => 'o',
            MacroKind::Transition => 't',
            MacroKind::Variance => 'v',
            MacroKind::State => 's',
            MacroKind::Mean => 'u',
            MacroKind::Duration => 'd',
        }
    }
}

// ---------------------------------------------------------------------------
// Macro
// ---------------------------------------------------------------------------

/// Definition carried by a macro, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MacroDef {
    Options(Options),
    Transition(Transition),
    Variance(Vector),
    State(State),
    Mean(Vector),
    Duration(Vector),
}

impl MacroDef {
    pub fn kind(&self) -> MacroKind {
        match self {
            MacroDef::Options(_) => MacroKind::Options,
            MacroDef::Transition(_) => MacroKind::Transition,
            MacroDef::Variance(_) => MacroKind::Variance,
            MacroDef::State(_) => MacroKind::State,
            MacroDef::Mean(_) => MacroKind::Mean,
            MacroDef::Duration(_) => MacroKind::Duration,
        }
    }
}

/// A named definition.  Option macros have an empty name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Macro {
    pub name: String,
    pub definition: MacroDef,
}

impl Macro {
    pub fn new(name: impl Into<String>, definition: MacroDef) -> Self {
        Self {
            name: name.into(),
            definition,
        }
    }

    pub fn options(options: Options) -> Self {
        Self::new("", MacroDef::Options(options))
    }

    pub fn kind(&self) -> MacroKind {
        self.definition.kind()
    }
}

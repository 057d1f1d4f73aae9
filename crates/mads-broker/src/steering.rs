//! Steering verbs and the single-key terminal translation for steerable
//! interactive mode (§4.4).
//!
//! The original's steering library swaps the meaning of `PAUSE` and
//! `RESUME`, and the broker compensates by sending the opposite verb. That
//! compensation is a workaround for a specific third-party library's bug
//! (see DESIGN.md, Open Question i); this steering socket is a plain
//! one-part control frame implemented from scratch, so `PAUSE` means pause
//! and `RESUME` means resume with no inversion.

use mads_core::error::{MadsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Pause,
    Resume,
    Terminate,
    Statistics,
}

impl Verb {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Verb::Pause => "PAUSE",
            Verb::Resume => "RESUME",
            Verb::Terminate => "TERMINATE",
            Verb::Statistics => "STATISTICS",
        }
    }

    pub fn parse(verb: &str) -> Result<Self> {
        match verb {
            "PAUSE" => Ok(Verb::Pause),
            "RESUME" => Ok(Verb::Resume),
            "TERMINATE" => Ok(Verb::Terminate),
            "STATISTICS" => Ok(Verb::Statistics),
            other => Err(MadsError::Transport(format!("unknown steering verb: {other}"))),
        }
    }
}

/// Translate a single terminal keystroke into a steering verb, or a reload
/// request (`x`), or `None` for an unrecognized key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalAction {
    Verb(Verb),
    Reload,
    Quit,
}

pub fn translate_key(key: char) -> Option<TerminalAction> {
    match key {
        'p' => Some(TerminalAction::Verb(Verb::Pause)),
        'r' => Some(TerminalAction::Verb(Verb::Resume)),
        'i' => Some(TerminalAction::Verb(Verb::Statistics)),
        'q' => Some(TerminalAction::Quit),
        'x' => Some(TerminalAction::Reload),
        _ => None,
    }
}

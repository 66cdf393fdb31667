// src/report.rs

//! Post-run report rendering.
//!
//! Walks the tree the ledger recorded while the graph was executed and
//! renders every node as `[OK]`/`[ERR]` with its identity and elapsed time.
//! Error text is printed once, beneath the deepest failing node of a path,
//! instead of being repeated at every ancestor it propagated through.

use std::fmt;
use std::io::IsTerminal;

use crate::engine::{LedgerSnapshot, Outcome};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Environment-derived default for colored output, computed once at
/// construction time by the caller.
pub fn color_default() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var("TERM").is_ok_and(|t| t == "dumb") {
        return false;
    }
    std::io::stderr().is_terminal()
}

/// Rendered view of one run.
pub struct Report {
    snapshot: LedgerSnapshot,
    color: bool,
}

impl Report {
    pub(crate) fn new(snapshot: LedgerSnapshot) -> Self {
        Self {
            snapshot,
            color: false,
        }
    }

    /// Enable or disable ANSI colors in the rendered output.
    pub fn colored(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Render the success/failure tree.
    pub fn render(&self) -> String {
        let mut out = String::from("Rundag Report:\n");
        let Some(root) = &self.snapshot.root else {
            return out;
        };
        for id in self.children_of(root) {
            self.write_node(&mut out, id, "", true, true);
        }
        out
    }

    fn children_of(&self, id: &str) -> &[String] {
        self.snapshot
            .children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn write_node(&self, out: &mut String, id: &str, prefix: &str, last: bool, top: bool) {
        let (own, cont) = if top {
            (String::new(), String::new())
        } else if last {
            (format!("{prefix}└── "), format!("{prefix}    "))
        } else {
            (format!("{prefix}├── "), format!("{prefix}│   "))
        };

        out.push_str(&own);
        out.push_str(&self.node_text(id));
        out.push('\n');

        if let Some(err) = self.error_to_show(id) {
            for line in err.lines() {
                out.push_str(&cont);
                out.push_str(&self.paint(line, RED));
                out.push('\n');
            }
        }

        let children = self.children_of(id);
        for (i, child) in children.iter().enumerate() {
            self.write_node(out, child, &cont, i + 1 == children.len(), false);
        }
    }

    fn node_text(&self, id: &str) -> String {
        let outcome = self.snapshot.outcomes.get(id);
        let failed = outcome.is_some_and(|o| o.err.is_some());
        let marker = if failed {
            self.paint("[ERR] ", RED)
        } else {
            self.paint("[OK] ", GREEN)
        };
        let took = outcome.map(|o| o.took).unwrap_or_default();
        format!("{marker}{id}{}", self.paint(&format!(" [took {took:?}]"), YELLOW))
    }

    /// Error text for `id`, unless a recorded child already failed; the
    /// child is the more precise place to show it.
    fn error_to_show(&self, id: &str) -> Option<String> {
        let outcome = self.snapshot.outcomes.get(id)?;
        let err = outcome.err.as_ref()?;
        let child_failed = self.children_of(id).iter().any(|child| {
            self.snapshot
                .outcomes
                .get(child)
                .is_some_and(|o: &Outcome| o.err.is_some())
        });
        if child_failed {
            None
        } else {
            Some(format!("{err:#}"))
        }
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

//! Runtime knobs read by the operator table and mainloop (§4.5, §5, §9A).
//! Loading this from a dotfile is out of scope (Non-goal: "persistence of
//! user configuration"); callers construct it directly.

/// Runtime configuration for a single editor instance.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Width a tab character/an indent step occupies, bounded to 8 by
    /// `expandtab()` (§4.5).
    pub tabwidth: u8,
    /// Whether `SHIFT_RIGHT`/`SHIFT_LEFT` indent with spaces rather than a
    /// literal tab.
    pub expandtab: bool,
    /// Jumplist ring capacity (§3: "a ring of at most N marks").
    pub jumplist_capacity: usize,
    /// Seconds of inactivity before `INSERT.idle` fires (§4.2, §5).
    pub idle_timeout_secs: u64,
    /// Whether search motions wrap around the end/start of the buffer
    /// (§4.3: "searches wrap").
    pub wrap_search: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tabwidth: 8,
            expandtab: false,
            jumplist_capacity: 31,
            idle_timeout_secs: 4,
            wrap_search: true,
        }
    }
}

impl Config {
    /// The string an indent step is realised as: `tabwidth` spaces when
    /// `expandtab` is set (capped to 8 per §4.5), else a literal tab.
    pub fn expand_tab(&self) -> String {
        if self.expandtab {
            " ".repeat(self.tabwidth.min(8) as usize)
        } else {
            "\t".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tab_spaces_when_enabled() {
        let cfg = Config {
            expandtab: true,
            tabwidth: 4,
            ..Config::default()
        };
        assert_eq!(cfg.expand_tab(), "    ");
    }

    #[test]
    fn expand_tab_literal_when_disabled() {
        let cfg = Config {
            expandtab: false,
            ..Config::default()
        };
        assert_eq!(cfg.expand_tab(), "\t");
    }

    #[test]
    fn expand_tab_bounded_to_eight() {
        let cfg = Config {
            expandtab: true,
            tabwidth: 16,
            ..Config::default()
        };
        assert_eq!(cfg.expand_tab().len(), 8);
    }
}

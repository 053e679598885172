//! Decides what a command should do from its flags, without touching the terminal.

use crate::plan::Scope;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub list: bool,
    pub estimate: bool,
    pub verify: bool,
    pub essential_only: bool,
    pub all: bool,
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    List,
    Estimate,
    Verify,
    /// `scope` is `None` when the user has to be asked which files they want.
    Fetch { scope: Option<Scope>, confirm: bool },
}

/// `--list` wins over `--estimate`, which wins over `--verify`. `--all` wins
/// over `--essential-only`, and `--yes` falls back to the essential files.
pub fn resolve_mode(flags: &ModeFlags) -> Mode {
    if flags.list {
        return Mode::List;
    }
    if flags.estimate {
        return Mode::Estimate;
    }
    if flags.verify {
        return Mode::Verify;
    }

    let scope = if flags.all {
        Some(Scope::All)
    } else if flags.essential_only || flags.yes {
        Some(Scope::Essential)
    } else {
        None
    };

    Mode::Fetch {
        scope,
        confirm: !flags.yes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_prefer_list() {
        let flags = ModeFlags {
            list: true,
            estimate: true,
            verify: true,
            all: true,
            ..ModeFlags::default()
        };

        assert_eq!(resolve_mode(&flags), Mode::List);
    }

    #[test]
    fn should_prefer_estimate_over_verify() {
        let flags = ModeFlags {
            estimate: true,
            verify: true,
            ..ModeFlags::default()
        };

        assert_eq!(resolve_mode(&flags), Mode::Estimate);
    }

    #[test]
    fn should_ask_without_flags() {
        assert_eq!(
            resolve_mode(&ModeFlags::default()),
            Mode::Fetch {
                scope: None,
                confirm: true
            }
        );
    }

    #[test]
    fn should_not_confirm_with_yes() {
        let flags = ModeFlags {
            yes: true,
            ..ModeFlags::default()
        };

        assert_eq!(
            resolve_mode(&flags),
            Mode::Fetch {
                scope: Some(Scope::Essential),
                confirm: false
            }
        );
    }

    #[test]
    fn should_prefer_all_over_essential() {
        let flags = ModeFlags {
            all: true,
            essential_only: true,
            ..ModeFlags::default()
        };

        assert_eq!(
            resolve_mode(&flags),
            Mode::Fetch {
                scope: Some(Scope::All),
                confirm: true
            }
        );
    }
}

//! Fluent, single-use command objects
//!
//! Each command collects its options and hands them to the backend when
//! `execute` consumes it. Commands borrow the backend from the
//! [`crate::GitClient`] that created them.

pub mod changelog;
pub mod checkout;
pub mod clone;
pub mod fetch;
pub mod init;
pub mod maintenance;
pub mod merge;
pub mod prune;
pub mod push;
pub mod revlist;
pub mod submodule;

pub use changelog::{AbortHandle, ChangelogCommand, ChangelogOptions, ChangelogOutcome, ChangelogState};
pub use checkout::{CheckoutCommand, CheckoutOptions};
pub use clone::{CloneCommand, CloneOptions};
pub use fetch::{FetchCommand, FetchOptions};
pub use init::{InitCommand, InitOptions};
pub use maintenance::{MaintenanceCommand, MaintenanceOutcome, MaintenanceTask};
pub use merge::{FastForwardMode, MergeCommand, MergeOptions, MergeStrategy};
pub use prune::{PruneCommand, PruneOptions};
pub use push::{PushCommand, PushOptions};
pub use revlist::{RevListCommand, RevListOptions};
pub use submodule::{SubmoduleUpdateCommand, SubmoduleUpdateOptions};

/// Effective depth of a shallow operation; `None` means full history
pub(crate) fn shallow_depth(shallow: bool, depth: Option<u32>) -> Option<u32> {
    if shallow {
        Some(depth.filter(|d| *d > 0).unwrap_or(1))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shallow_depth() {
        assert_eq!(shallow_depth(false, Some(3)), None);
        assert_eq!(shallow_depth(true, None), Some(1));
        assert_eq!(shallow_depth(true, Some(0)), Some(1));
        assert_eq!(shallow_depth(true, Some(2)), Some(2));
    }
}

pub mod executor;
pub mod parser;
pub mod refs;
pub mod version;

// Re-export commonly used types
pub use executor::{duration_label, CommandOutput, GitExecutor, Invocation};
pub use parser::{parse_branch_list, parse_ls_remote, parse_rev_list, parse_show_ref};
pub use refs::{glob_match, Branch, ObjectId};
pub use version::GitVersion;

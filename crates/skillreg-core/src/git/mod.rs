//! Git operations for checking out a repository at a commit.

mod checkout;

pub use checkout::clone_at;

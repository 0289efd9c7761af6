pub mod dialog;
pub mod git;
pub mod meeting;
pub mod report;
pub mod task;

pub use dialog::*;
pub use git::*;
pub use meeting::*;
pub use report::*;
pub use task::*;

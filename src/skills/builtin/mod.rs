pub mod analysis;
pub mod default;
pub mod file_read;
pub mod web_search;

pub use analysis::SimpleAnalysisSkill;
pub use default::DefaultSkill;
pub use file_read::FileReadSkill;
pub use web_search::{SearchChain, WebSearchSkill};

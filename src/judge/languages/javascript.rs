use crate::judge::plan::{CommandTemplate, LanguagePlan, SourceNaming};

pub fn plan() -> LanguagePlan {
    LanguagePlan::interpreted(
        "javascript",
        SourceNaming::Fixed("solution.js"),
        "js",
        CommandTemplate::new(["node", "{source}"]),
    )
}

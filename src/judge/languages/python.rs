use crate::judge::plan::{CommandTemplate, LanguagePlan, SourceNaming};

pub fn plan() -> LanguagePlan {
    // -B: never leave .pyc files behind in the workspace.
    LanguagePlan::interpreted(
        "python",
        SourceNaming::Fixed("solution.py"),
        "py",
        CommandTemplate::new(["python3", "-B", "{source}"]),
    )
}

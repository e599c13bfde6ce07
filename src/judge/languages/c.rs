use crate::judge::plan::{CommandTemplate, LanguagePlan, SourceNaming};

pub fn plan() -> LanguagePlan {
    LanguagePlan::compiled(
        "c",
        SourceNaming::Fixed("solution.c"),
        "c",
        CommandTemplate::new([
            "gcc",
            "-std=c11",
            "-O2",
            "-pipe",
            "-o",
            "{artifact}",
            "{source}",
            "-lm",
        ]),
        CommandTemplate::new(["{artifact}"]),
    )
}

use crate::judge::plan::{CommandTemplate, LanguagePlan, SourceNaming};

pub fn plan() -> LanguagePlan {
    LanguagePlan::compiled(
        "cpp",
        SourceNaming::Fixed("solution.cpp"),
        "cpp",
        CommandTemplate::new([
            "g++",
            "-std=c++17",
            "-O2",
            "-pipe",
            "-o",
            "{artifact}",
            "{source}",
        ]),
        CommandTemplate::new(["{artifact}"]),
    )
}

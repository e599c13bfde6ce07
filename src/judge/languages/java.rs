use crate::judge::plan::{CommandTemplate, LanguagePlan, SourceNaming};

/// javac insists the file is named after the public type, so the name
/// comes from the source text at materialization time.
pub fn plan() -> LanguagePlan {
    LanguagePlan::compiled(
        "java",
        SourceNaming::PublicType,
        "java",
        CommandTemplate::new(["javac", "-encoding", "UTF-8", "{source}"]),
        CommandTemplate::new([
            "java",
            "-Xss64m",
            "-XX:+UseSerialGC",
            "-Dfile.encoding=UTF-8",
            "-cp",
            "{workdir}",
            "{unit}",
        ]),
    )
}

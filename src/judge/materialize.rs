/// Source materialization: pick the file name and write the code into a workspace
use crate::judge::plan::{CompilationUnit, LanguagePlan, SourceNaming};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Materialization rejections that are reported as classified results.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterializationError {
    #[error("no public top-level type declaration found; the source must declare a public class")]
    NoPublicType,
}

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error(transparent)]
    Rejected(#[from] MaterializationError),

    #[error("failed to write source file: {0}")]
    Io(#[from] std::io::Error),
}

const PUBLIC_TYPE_PATTERN: &str = r"\bpublic\s+(?:(?:abstract|final|static|strictfp|sealed|non-sealed)\s+)*(?:class|interface|enum|record|@\s*interface)\s+([\p{L}_$][\p{L}\p{N}_$]*)";

fn public_type_regex() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(PUBLIC_TYPE_PATTERN) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                log::error!("Invalid public type pattern: {}", e);
                None
            }
        })
        .as_ref()
}

/// Blank out comments and string/char literals, keeping offsets stable.
fn strip_comments_and_literals(code: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str,
        TextBlock,
        Char,
    }

    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len());
    let mut state = State::Code;
    let mut i = 0;

    let blank = |c: char| if c == '\n' { '\n' } else { ' ' };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match state {
            State::Code => match (c, next) {
                ('/', Some('/')) => {
                    state = State::LineComment;
                    out.push_str("  ");
                    i += 2;
                    continue;
                }
                ('/', Some('*')) => {
                    state = State::BlockComment;
                    out.push_str("  ");
                    i += 2;
                    continue;
                }
                ('"', _) if next == Some('"') && chars.get(i + 2) == Some(&'"') => {
                    state = State::TextBlock;
                    out.push_str("   ");
                    i += 3;
                    continue;
                }
                ('"', _) => {
                    state = State::Str;
                    out.push(' ');
                }
                ('\'', _) => {
                    state = State::Char;
                    out.push(' ');
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                }
                out.push(blank(c));
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    state = State::Code;
                    out.push_str("  ");
                    i += 2;
                    continue;
                }
                out.push(blank(c));
            }
            State::TextBlock => {
                if c == '"' && next == Some('"') && chars.get(i + 2) == Some(&'"') {
                    state = State::Code;
                    out.push_str("   ");
                    i += 3;
                    continue;
                }
                out.push(blank(c));
            }
            State::Str | State::Char => {
                let terminator = if state == State::Str { '"' } else { '\'' };
                if c == '\\' {
                    out.push(' ');
                    if let Some(escaped) = next {
                        out.push(blank(escaped));
                    }
                    i += 2;
                    continue;
                }
                if c == terminator || c == '\n' {
                    state = State::Code;
                }
                out.push(blank(c));
            }
        }
        i += 1;
    }

    out
}

/// First public type declared at brace depth zero.
pub fn find_public_type(code: &str) -> Option<String> {
    let cleaned = strip_comments_and_literals(code);
    let mut depth: i64 = 0;
    let mut scanned = 0;

    for captures in public_type_regex()?.captures_iter(&cleaned) {
        let whole = captures.get(0)?;
        for c in cleaned[scanned..whole.start()].chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
        scanned = whole.start();
        if depth <= 0 {
            return captures.get(1).map(|name| name.as_str().to_string());
        }
    }
    None
}

/// Decide the unit name and write the source into `workdir`.
///
/// For public-type plans the rejection happens before anything touches
/// the filesystem, so no process is ever spawned for such sources.
pub fn materialize(
    plan: &LanguagePlan,
    workdir: &Path,
    code: &str,
) -> std::result::Result<CompilationUnit, MaterializeError> {
    let (source_name, unit_name) = match plan.naming() {
        SourceNaming::Fixed(name) => {
            let stem = Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| name.to_string());
            (name.to_string(), stem)
        }
        SourceNaming::PublicType => {
            let type_name = find_public_type(code).ok_or(MaterializationError::NoPublicType)?;
            (format!("{}.{}", type_name, plan.extension()), type_name)
        }
    };

    let unit = CompilationUnit {
        workdir: workdir.to_path_buf(),
        source_name,
        unit_name,
        artifact_name: plan.artifact_name().to_string(),
    };

    fs::write(unit.source_path(), code)?;
    log::debug!(
        "Materialized {} source as {}",
        plan.id(),
        unit.source_path().display()
    );
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::languages;

    #[test]
    fn public_type_pattern_compiles() {
        assert!(public_type_regex().is_some());
    }

    #[test]
    fn finds_simple_public_class() {
        let code = "import java.util.*;\npublic class Solver {\n  public static void main(String[] a) {}\n}\n";
        assert_eq!(find_public_type(code).as_deref(), Some("Solver"));
    }

    #[test]
    fn handles_modifiers_annotations_and_other_kinds() {
        assert_eq!(
            find_public_type("@SuppressWarnings(\"all\") public final class Main {}").as_deref(),
            Some("Main")
        );
        assert_eq!(
            find_public_type("public abstract class Shape {}").as_deref(),
            Some("Shape")
        );
        assert_eq!(find_public_type("public enum Color { RED }").as_deref(), Some("Color"));
        assert_eq!(
            find_public_type("public record Point(int x, int y) {}").as_deref(),
            Some("Point")
        );
        assert_eq!(find_public_type("public interface Api {}").as_deref(), Some("Api"));
    }

    #[test]
    fn ignores_comments_strings_and_nested_types() {
        let code = r#"
// public class Commented {}
/* public class Blocked {} */
class Helper {
    public static class Nested {}
    String s = "public class Quoted {}";
}
public class Real {}
"#;
        assert_eq!(find_public_type(code).as_deref(), Some("Real"));
    }

    #[test]
    fn first_match_wins() {
        let code = "public class First {}\npublic class Second {}";
        assert_eq!(find_public_type(code).as_deref(), Some("First"));
    }

    #[test]
    fn missing_public_type_is_none() {
        assert_eq!(find_public_type("class Main { }"), None);
        assert_eq!(find_public_type("publicclass Main {}"), None);
    }

    #[test]
    fn materialize_uses_fixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let unit = materialize(&languages::python::plan(), dir.path(), "print('hi')").unwrap();
        assert_eq!(unit.source_name, "solution.py");
        assert_eq!(unit.unit_name, "solution");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("solution.py")).unwrap(),
            "print('hi')"
        );
    }

    #[test]
    fn materialize_names_java_after_public_type() {
        let dir = tempfile::tempdir().unwrap();
        let unit = materialize(
            &languages::java::plan(),
            dir.path(),
            "public class Solver { public static void main(String[] a) {} }",
        )
        .unwrap();
        assert_eq!(unit.source_name, "Solver.java");
        assert_eq!(unit.unit_name, "Solver");
        assert!(dir.path().join("Solver.java").exists());
    }

    #[test]
    fn materialize_rejects_java_without_public_type_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let err = materialize(&languages::java::plan(), dir.path(), "class Main {}").unwrap_err();
        assert!(matches!(
            err,
            MaterializeError::Rejected(MaterializationError::NoPublicType)
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

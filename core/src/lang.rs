//! The language capability table.

use std::{collections::HashMap, fmt, sync::Arc};

use once_cell::sync::Lazy;
use polyrun_webclient::Language;
use strum::IntoEnumIterator as _;

use crate::str_interp::{interp, InterpError};

/// A whitespace-separated command line whose tokens may contain `#{var}`.
///
/// Tokens are interpolated one by one and the result is spawned directly,
/// without a shell, so substituted paths never need quoting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    argv: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Empty command template")]
pub struct EmptyCommand;

impl CommandTemplate {
    pub fn parse(s: &str) -> Result<Self, EmptyCommand> {
        let argv: Vec<String> = s.split_whitespace().map(str::to_owned).collect();
        if argv.is_empty() {
            return Err(EmptyCommand);
        }
        Ok(Self { argv })
    }

    pub fn resolve(&self, vars: &HashMap<&str, String>) -> Result<ResolvedCommand, InterpError> {
        let mut argv = self
            .argv
            .iter()
            .map(|token| interp(token, vars))
            .collect::<Result<Vec<_>, _>>()?;
        let program = argv.remove(0);
        Ok(ResolvedCommand {
            program,
            args: argv,
        })
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ResolvedCommand {
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.chars().count() > 80 {
                let head: String = arg.chars().take(77).collect();
                write!(f, " {}...", head)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSpec {
    pub language: Language,
    pub compile: Option<CommandTemplate>,
    pub run: CommandTemplate,
    pub file_suffix: &'static str,
    /// File stem of the generated source; Java requires it to match the
    /// public class name.
    pub source_stem: &'static str,
    /// Path of the harness template inside the embedded assets.
    pub harness_template: &'static str,
}

impl LanguageSpec {
    pub fn needs_compile(&self) -> bool {
        self.compile.is_some()
    }

    pub fn source_file_name(&self) -> String {
        format!("{}.{}", self.source_stem, self.file_suffix)
    }

    fn builtin(language: Language) -> Self {
        use Language::*;
        let cmd = |s: &str| CommandTemplate::parse(s).expect("builtin command is never empty");
        match language {
            Python => Self {
                language,
                compile: None,
                run: cmd("python3 #{srcPath}"),
                file_suffix: "py",
                source_stem: "main",
                harness_template: "harness/python.py",
            },
            JavaScript => Self {
                language,
                compile: None,
                run: cmd("node #{srcPath}"),
                file_suffix: "js",
                source_stem: "main",
                harness_template: "harness/javascript.js",
            },
            TypeScript => Self {
                language,
                compile: None,
                run: cmd("npx --yes tsx #{srcPath}"),
                file_suffix: "ts",
                source_stem: "main",
                harness_template: "harness/typescript.ts",
            },
            Cpp => Self {
                language,
                compile: Some(cmd("g++ -std=c++17 -O2 -o #{binPath} #{srcPath}")),
                run: cmd("#{binPath}"),
                file_suffix: "cpp",
                source_stem: "main",
                harness_template: "harness/cpp.cpp",
            },
            Java => Self {
                language,
                compile: Some(cmd("javac -encoding UTF-8 -d #{workDir} #{srcPath}")),
                run: cmd(
                    "java -Dfile.encoding=UTF-8 -Dsun.stdout.encoding=UTF-8 \
                     -Dsun.stderr.encoding=UTF-8 -Dstdout.encoding=UTF-8 \
                     -Dstderr.encoding=UTF-8 -cp #{workDir} #{className}",
                ),
                file_suffix: "java",
                source_stem: "Main",
                harness_template: "harness/java.java",
            },
        }
    }
}

/// Frozen mapping from language to its toolchain.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTable {
    specs: HashMap<Language, LanguageSpec>,
}

pub static DEFAULT_LANGUAGES: Lazy<Arc<LanguageTable>> =
    Lazy::new(|| Arc::new(LanguageTable::builtin()));

impl LanguageTable {
    pub fn builtin() -> Self {
        Self {
            specs: Language::iter()
                .map(|lang| (lang, LanguageSpec::builtin(lang)))
                .collect(),
        }
    }

    pub fn from_specs(specs: impl IntoIterator<Item = LanguageSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.language, s)).collect(),
        }
    }

    pub fn get(&self, language: Language) -> Option<&LanguageSpec> {
        self.specs.get(&language)
    }

    /// Specs in a stable order, for display.
    pub fn iter(&self) -> impl Iterator<Item = &LanguageSpec> {
        Language::iter().filter_map(|lang| self.specs.get(&lang))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builtin_table_covers_every_language() {
        let table = LanguageTable::builtin();
        assert_eq!(table.len(), 5);
        for lang in Language::iter() {
            let spec = table.get(lang).unwrap();
            assert_eq!(spec.needs_compile(), lang.needs_compile(), "{}", lang);
        }
        assert_eq!(table.get(Language::Java).unwrap().source_file_name(), "Main.java");
        assert_eq!(table.get(Language::Python).unwrap().source_file_name(), "main.py");
    }

    #[test]
    fn resolve_interpolates_each_token() {
        let tmpl = CommandTemplate::parse("g++  -O2 -o #{binPath}\t#{srcPath}").unwrap();
        let vars: HashMap<&str, String> = [
            ("binPath", "/tmp/a b/main".to_owned()),
            ("srcPath", "/tmp/a b/main.cpp".to_owned()),
        ]
        .into_iter()
        .collect();

        let cmd = tmpl.resolve(&vars).unwrap();
        assert_eq!(cmd.program, "g++");
        assert_eq!(cmd.args, ["-O2", "-o", "/tmp/a b/main", "/tmp/a b/main.cpp"]);

        let cmd = cmd.arg(r#"{"x": 5}"#);
        assert_eq!(cmd.args.last().unwrap(), r#"{"x": 5}"#);
    }

    #[test]
    fn empty_template_is_rejected() {
        assert_eq!(CommandTemplate::parse("   "), Err(EmptyCommand));
    }

    #[test]
    fn unknown_variable_fails_to_resolve() {
        let tmpl = CommandTemplate::parse("python3 #{scriptPath}").unwrap();
        assert!(tmpl.resolve(&HashMap::new()).is_err());
    }
}

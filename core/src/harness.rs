//! Harness generation: wraps candidate code in a per-language entry point.
//!
//! Every harness reads its input as JSON from the last command-line
//! argument, calls the located entry point, and prints the JSON-encoded
//! return value on the line after a [`Marker`].

pub mod entry;

use std::{collections::HashMap, fmt, sync::Arc};

use polyrun_webclient::{Language, Value};

pub use self::entry::{EntryPoint, Param, ENTRY_POINTS};
use crate::{
    assets,
    error::HarnessError,
    lang::{LanguageTable, DEFAULT_LANGUAGES},
    str_interp::interp,
};

/// Sentinel line separating user output from the result payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker(String);

impl Marker {
    /// A fresh `__POLYRUN_RESULT_<hex>__` token.
    pub fn random() -> Self {
        Self(format!("__POLYRUN_RESULT_{:032x}__", rand::random::<u128>()))
    }

    /// A fixed token. It has to fit on one line and must not contain
    /// characters the harness templates would have to escape.
    pub fn fixed(token: impl Into<String>) -> Result<Self, HarnessError> {
        let token = token.into();
        let ok = !token.is_empty()
            && token
                .chars()
                .all(|c| c.is_ascii_graphic() && !matches!(c, '"' | '\\' | '#' | '\''));
        if ok {
            Ok(Self(token))
        } else {
            Err(HarnessError::InvalidMarker(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Harness {
    pub language: Language,
    pub source: String,
    pub marker: Marker,
    pub entry: EntryPoint,
    /// JSON text passed as the last command-line argument.
    pub argv_input: String,
}

#[derive(Debug, Clone)]
pub struct HarnessGenerator {
    languages: Arc<LanguageTable>,
    fixed_marker: Option<Marker>,
}

impl Default for HarnessGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGES.clone())
    }
}

impl HarnessGenerator {
    pub fn new(languages: Arc<LanguageTable>) -> Self {
        Self {
            languages,
            fixed_marker: None,
        }
    }

    /// Use `marker` for every harness instead of a fresh random one.
    pub fn fixed_marker(mut self, marker: Option<Marker>) -> Self {
        self.fixed_marker = marker;
        self
    }

    pub fn generate(
        &self,
        code: &str,
        language: Language,
        input: &Value,
    ) -> Result<Harness, HarnessError> {
        let spec = self
            .languages
            .get(language)
            .ok_or(HarnessError::UnsupportedLanguage(language))?;
        let template = assets::text(spec.harness_template)
            .ok_or_else(|| HarnessError::MissingTemplate(spec.harness_template.to_owned()))?;

        let marker = self.fixed_marker.clone().unwrap_or_else(Marker::random);

        let mut vars: HashMap<&str, String> = HashMap::new();
        vars.insert("marker", marker.to_string());

        use Language::*;
        let entry = match language {
            Python => {
                let names = entry::candidates(language)
                    .map(|n| format!("\"{}\"", n))
                    .collect::<Vec<_>>()
                    .join(", ");
                vars.insert("code", code.to_owned());
                vars.insert("entryPoints", format!("[{}]", names));
                vars.insert("entryPointsDisplay", display_candidates(language));
                EntryPoint::Deferred
            }
            JavaScript | TypeScript => {
                let chain = entry::candidates(language)
                    .map(|n| format!("  if (typeof {n} === \"function\") return [\"{n}\", {n}];"))
                    .collect::<Vec<_>>()
                    .join("\n");
                vars.insert("code", code.to_owned());
                vars.insert("entryPoints", chain);
                vars.insert("entryPointsDisplay", display_candidates(language));
                EntryPoint::Deferred
            }
            Cpp => {
                let entry = entry::locate(code, language);
                vars.insert("code", code.to_owned());
                vars.insert("paramNames", param_names(&entry));
                vars.insert("invoke", cpp_invoke(&entry, language));
                entry
            }
            Java => {
                let (imports, body) = java_split_imports(code);
                let body = java_wrap_solution(&body);
                let entry = entry::locate(&body, language);
                vars.insert("imports", imports);
                vars.insert("code", body);
                vars.insert("paramNames", param_names(&entry));
                vars.insert("invoke", java_invoke(&entry, language));
                entry
            }
        };

        let source = interp(&template, &vars).map_err(|source| HarnessError::Render {
            template: spec.harness_template.to_owned(),
            source,
        })?;

        Ok(Harness {
            language,
            source,
            marker,
            entry,
            argv_input: ascii_json(input)?,
        })
    }
}

/// JSON text with every non-ASCII character written as a `\uXXXX` escape,
/// so the argument survives runtimes that decode argv with a non-UTF-8
/// locale charset.
fn ascii_json(input: &Value) -> serde_json::Result<String> {
    let json = serde_json::to_string(input)?;
    let mut out = String::with_capacity(json.len());
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        // Non-ASCII only occurs inside string literals.
        for unit in c.encode_utf16(&mut units).iter() {
            out.push_str(&format!("\\u{:04x}", unit));
        }
    }
    Ok(out)
}

fn display_candidates(language: Language) -> String {
    entry::candidates(language).collect::<Vec<_>>().join(", ")
}

fn first_candidate(language: Language) -> &'static str {
    entry::candidates(language).next().unwrap_or(ENTRY_POINTS[0])
}

fn param_names(entry: &EntryPoint) -> String {
    match entry {
        EntryPoint::Found { params, .. } => params
            .iter()
            .map(|p| format!("\"{}\"", p.name))
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

fn cpp_invoke(entry: &EntryPoint, language: Language) -> String {
    match entry {
        EntryPoint::Found {
            name, in_solution, ..
        } if *in_solution => format!("polyrun::call(&Solution::{}, input, names)", name),
        EntryPoint::Found { name, .. } => format!("polyrun::call({}, input, names)", name),
        // Let the compiler report the missing definition.
        _ => format!("polyrun::call({}, input, names)", first_candidate(language)),
    }
}

fn java_invoke(entry: &EntryPoint, language: Language) -> String {
    const INDENT: &str = "        ";
    let EntryPoint::Found {
        name,
        params,
        is_static,
        returns_void,
        ..
    } = entry
    else {
        return format!(
            "{}Object result = Solution.{}(input);",
            INDENT,
            first_candidate(language)
        );
    };

    let receiver = if *is_static {
        "Solution"
    } else {
        "new Solution()"
    };
    let args = params
        .iter()
        .enumerate()
        .map(|(i, p)| java_convert(&p.ty, &format!("args[{}]", i)))
        .collect::<Vec<_>>()
        .join(", ");
    let call = format!("{}.{}({})", receiver, name, args);

    if *returns_void {
        format!("{INDENT}{call};\n{INDENT}Object result = null;")
    } else {
        format!("{INDENT}Object result = {call};")
    }
}

/// Conversion from the decoded JSON object graph to a declared Java type.
fn java_convert(ty: &str, arg: &str) -> String {
    let ty: String = ty
        .split_whitespace()
        .filter(|w| *w != "final")
        .collect();
    let helper = match ty.as_str() {
        "int" | "Integer" => "toInt",
        "long" | "Long" => "toLong",
        "double" | "Double" => "toDouble",
        "float" | "Float" => "toFloat",
        "boolean" | "Boolean" => "toBool",
        "String" => "toStr",
        "int[]" => "toIntArray",
        "long[]" => "toLongArray",
        "double[]" => "toDoubleArray",
        "String[]" => "toStrArray",
        "int[][]" => "toIntMatrix",
        "List<Integer>" => "toIntList",
        "List<Long>" => "toLongList",
        _ => "cast",
    };
    format!("{}({})", helper, arg)
}

/// Pulls `import` lines to the top of the file and drops `package` lines.
fn java_split_imports(code: &str) -> (String, String) {
    let mut imports = Vec::new();
    let mut body = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("import ") {
            imports.push(trimmed);
        } else if !trimmed.starts_with("package ") {
            body.push(line);
        }
    }
    (imports.join("\n"), body.join("\n"))
}

/// Candidate code without a `Solution` class is wrapped into one; a
/// `public class Solution` loses `public` since `Main` owns the file.
fn java_wrap_solution(body: &str) -> String {
    let re = lazy_regex::regex!(r"\b(?:public\s+)?((?:final\s+)?class\s+Solution\b)");
    if re.is_match(body) {
        re.replace(body, "$1").into_owned()
    } else {
        format!("class Solution {{\n{}\n}}", body)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn generate(code: &str, language: Language) -> Harness {
        HarnessGenerator::default()
            .generate(code, language, &json!({"x": 5}))
            .unwrap()
    }

    #[test]
    fn random_markers_differ() {
        let a = Marker::random();
        let b = Marker::random();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("__POLYRUN_RESULT_"));
        assert_eq!(a.as_str().len(), "__POLYRUN_RESULT___".len() + 32);
    }

    #[test]
    fn fixed_marker_is_validated() {
        assert!(Marker::fixed("__RESULT__").is_ok());
        assert!(Marker::fixed("").is_err());
        assert!(Marker::fixed("two words").is_err());
        assert!(Marker::fixed("a\"b").is_err());
    }

    #[test]
    fn python_harness_embeds_code_and_marker() {
        let code = "def solution(data):\n    print('hi')\n    return data['x']\n";
        let h = generate(code, Language::Python);
        assert!(h.source.contains(code));
        assert!(h.source.contains(&format!("\"\\n{}\\n\"", h.marker)));
        assert!(h
            .source
            .contains(r#"["solution", "solve", "main", "run", "answer"]"#));
        assert_eq!(h.entry, EntryPoint::Deferred);
        assert_eq!(h.argv_input, r#"{"x":5}"#);
    }

    #[test]
    fn code_is_inserted_verbatim() {
        let code = "function solve(d) { return '#{notAVar} ## ' + d.x; }";
        let h = generate(code, Language::JavaScript);
        assert!(h.source.contains(code));
        assert!(h
            .source
            .contains(r#"if (typeof solve === "function") return ["solve", solve];"#));
    }

    #[test]
    fn cpp_harness_calls_located_function() {
        let code = "int solve(int a, int b) { return a + b; }";
        let h = generate(code, Language::Cpp);
        assert!(h.entry.is_found());
        assert!(h.source.contains("std::vector<std::string> names = {\"a\", \"b\"};"));
        assert!(h.source.contains("Json result = polyrun::call(solve, input, names);"));
    }

    #[test]
    fn cpp_member_function_goes_through_solution() {
        let code = "class Solution {\npublic:\n    int solution(int x) { return x; }\n};";
        let h = generate(code, Language::Cpp);
        assert!(h
            .source
            .contains("polyrun::call(&Solution::solution, input, names)"));
    }

    #[test]
    fn cpp_missing_entry_point_still_emits_a_call() {
        let h = generate("int helper() { return 1; }", Language::Cpp);
        assert_eq!(h.entry, EntryPoint::NotFound);
        assert!(h.source.contains("polyrun::call(solution, input, names)"));
    }

    #[test]
    fn java_wraps_bare_methods_and_hoists_imports() {
        let code = "import java.util.function.*;\n\nstatic int solve(int x, int[] ys) { return x; }";
        let h = generate(code, Language::Java);
        let import_at = h.source.find("import java.util.function.*;").unwrap();
        let class_at = h.source.find("class Solution {").unwrap();
        assert!(import_at < class_at);
        assert!(h
            .source
            .contains("Object result = Solution.solve(toInt(args[0]), toIntArray(args[1]));"));
    }

    #[test]
    fn java_instance_void_method() {
        let code = "public class Solution {\n    public void run(Map<String, Object> data) {}\n}";
        let h = generate(code, Language::Java);
        assert!(!h.source.contains("public class Solution"));
        assert!(h.source.contains("new Solution().run(cast(args[0]));"));
        assert!(h.source.contains("Object result = null;"));
    }

    #[test]
    fn unsupported_language_is_reported() {
        let table = LanguageTable::from_specs(std::iter::empty());
        let err = HarnessGenerator::new(Arc::new(table))
            .generate("", Language::Python, &Value::Null)
            .unwrap_err();
        assert!(matches!(err, HarnessError::UnsupportedLanguage(Language::Python)));
    }

    #[test]
    fn fixed_marker_is_used() {
        let marker = Marker::fixed("__RESULT__").unwrap();
        let h = HarnessGenerator::default()
            .fixed_marker(Some(marker.clone()))
            .generate("def run(d): return d", Language::Python, &Value::Null)
            .unwrap();
        assert_eq!(h.marker, marker);
        assert!(h.source.contains("\\n__RESULT__\\n"));
        assert_eq!(h.argv_input, "null");
    }

    #[test]
    fn argv_input_is_ascii() {
        let input = json!({"s": "a\u{e9}\u{1f600}", "k\u{fc}": [1]});
        let h = HarnessGenerator::default()
            .generate("def run(d): return d", Language::Java, &input)
            .unwrap();
        assert!(h.argv_input.is_ascii(), "{}", h.argv_input);
        assert!(h.argv_input.contains(r"a\u00e9\ud83d\ude00"));
        let decoded: Value = serde_json::from_str(&h.argv_input).unwrap();
        assert_eq!(decoded, input);
    }
}

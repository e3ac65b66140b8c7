//! Entry-point lookup.
//!
//! Interpreted languages resolve the callable themselves at run time by
//! walking [`ENTRY_POINTS`]. For compiled languages the definition is located
//! here, in the source text, so the harness can emit a direct call.

use lazy_regex::{lazy_regex, Lazy, Regex};
use polyrun_webclient::Language;

/// Conventional entry-point names, highest priority first.
pub const ENTRY_POINTS: [&str; 5] = ["solution", "solve", "main", "run", "answer"];

static RE_DEFINITION: Lazy<Regex> = lazy_regex!(
    r"\b(?P<name>[A-Za-z_]\w*)\s*\((?P<params>[^()]*)\)\s*(?:const\s*)?(?:noexcept\s*)?(?:throws\s+[\w.,\s]+)?\{"
);
static RE_PARAM: Lazy<Regex> =
    lazy_regex!(r"^(?P<ty>.*?)(?P<name>[A-Za-z_]\w*)\s*(?P<dims>(?:\[\s*\]\s*)*)$");
static RE_SOLUTION_TYPE: Lazy<Regex> = lazy_regex!(r"\b(?:class|struct)\s+Solution\b[^{;]*\{");

/// Candidate names for `language`, in lookup order.
///
/// `main` is the program entry of compiled languages and never a candidate
/// there.
pub fn candidates(language: Language) -> impl Iterator<Item = &'static str> {
    ENTRY_POINTS
        .into_iter()
        .filter(move |name| !(language.needs_compile() && *name == "main"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// Resolved by the interpreter when the harness runs.
    Deferred,
    Found {
        name: String,
        params: Vec<Param>,
        is_static: bool,
        returns_void: bool,
        /// Defined inside `class Solution` / `struct Solution`.
        in_solution: bool,
    },
    NotFound,
}

impl EntryPoint {
    pub fn name(&self) -> Option<&str> {
        match self {
            EntryPoint::Found { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, EntryPoint::Found { .. })
    }
}

/// Finds the highest-priority candidate defined in `code`.
pub fn locate(code: &str, language: Language) -> EntryPoint {
    let solution_body = solution_body_range(code);

    for candidate in candidates(language) {
        let found = RE_DEFINITION
            .captures_iter(code)
            .find(|caps| &caps["name"] == candidate);
        let Some(caps) = found else {
            continue;
        };
        let Some(whole) = caps.get(0) else {
            continue;
        };

        let line_start = code[..whole.start()].rfind('\n').map_or(0, |i| i + 1);
        let head = &code[line_start..whole.start()];
        let head_words: Vec<&str> = head
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .collect();

        let entry = EntryPoint::Found {
            name: candidate.to_owned(),
            params: parse_params(&caps["params"]),
            is_static: head_words.contains(&"static"),
            returns_void: head_words.last() == Some(&"void"),
            in_solution: solution_body
                .as_ref()
                .map_or(false, |range| range.contains(&whole.start())),
        };
        log::debug!("Located entry point for {}: {:?}", language, entry);
        return entry;
    }

    log::debug!("No entry point located for {}", language);
    EntryPoint::NotFound
}

/// Splits a parameter list on top-level commas and separates each
/// declaration into type and name.
pub fn parse_params(list: &str) -> Vec<Param> {
    let list = list.trim();
    if list.is_empty() || list == "void" {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in list.chars() {
        match c {
            '<' | '[' | '{' => depth += 1,
            '>' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current);

    parts
        .iter()
        .filter_map(|part| {
            // C++ default arguments
            let decl = part.split('=').next().unwrap_or_default().trim();
            let caps = RE_PARAM.captures(decl)?;
            let dims: String = caps["dims"].split_whitespace().collect();
            Some(Param {
                name: caps["name"].to_owned(),
                ty: format!("{}{}", caps["ty"].trim(), dims),
            })
        })
        .collect()
}

/// Byte range of the body of the first `class Solution` / `struct Solution`.
fn solution_body_range(code: &str) -> Option<std::ops::Range<usize>> {
    let m = RE_SOLUTION_TYPE.find(code)?;
    let open = m.end();
    let mut depth = 1usize;
    for (i, c) in code[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open..open + i);
                }
            }
            _ => {}
        }
    }
    Some(open..code.len())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn compiled_languages_skip_main() {
        let cpp: Vec<_> = candidates(Language::Cpp).collect();
        assert_eq!(cpp, ["solution", "solve", "run", "answer"]);
        let py: Vec<_> = candidates(Language::Python).collect();
        assert_eq!(py, ENTRY_POINTS);
    }

    #[test]
    fn locates_highest_priority_free_function() {
        let code = r#"
int helper(int x) { return x; }
long long solve(const vector<int>& nums, int k) {
    return helper(k);
}
Json solution(const Json& data) {
    return data["x"];
}
"#;
        let entry = locate(code, Language::Cpp);
        assert_eq!(
            entry,
            EntryPoint::Found {
                name: "solution".to_owned(),
                params: vec![Param {
                    name: "data".to_owned(),
                    ty: "const Json&".to_owned(),
                }],
                is_static: false,
                returns_void: false,
                in_solution: false,
            }
        );
    }

    #[test]
    fn locates_method_inside_solution_class() {
        let code = r#"
class Solution {
public:
    vector<int> twoSum(vector<int>& nums, int target) { return {}; }
    void run(vector<int> nums, int target) {
        twoSum(nums, target);
    }
};
"#;
        let EntryPoint::Found {
            name,
            params,
            is_static,
            returns_void,
            in_solution,
        } = locate(code, Language::Cpp)
        else {
            panic!("entry point not found");
        };
        assert_eq!(name, "run");
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].ty, "vector<int>");
        assert_eq!(params[1].name, "target");
        assert!(!is_static);
        assert!(returns_void);
        assert!(in_solution);
    }

    #[test]
    fn java_static_method_with_array_params() {
        let code = r#"
import java.util.*;

class Solution {
    public static int solve(int[] nums, Map<String, Integer> counts, final String name) {
        return nums.length;
    }

    public static void main(String[] args) {}
}
"#;
        let EntryPoint::Found {
            name,
            params,
            is_static,
            ..
        } = locate(code, Language::Java)
        else {
            panic!("entry point not found");
        };
        assert_eq!(name, "solve");
        assert!(is_static);
        let tys: Vec<_> = params.iter().map(|p| p.ty.as_str()).collect();
        assert_eq!(tys, ["int[]", "Map<String, Integer>", "final String"]);
    }

    #[test]
    fn calls_are_not_definitions() {
        let code = "int main() { return solve(3); }";
        assert_eq!(locate(code, Language::Cpp), EntryPoint::NotFound);
    }

    #[test]
    fn params_handle_defaults_and_c_arrays() {
        let params = parse_params("int a = 3, int nums[], std::map<std::string, int> m");
        assert_eq!(
            params,
            vec![
                Param {
                    name: "a".to_owned(),
                    ty: "int".to_owned()
                },
                Param {
                    name: "nums".to_owned(),
                    ty: "int[]".to_owned()
                },
                Param {
                    name: "m".to_owned(),
                    ty: "std::map<std::string, int>".to_owned()
                },
            ]
        );
        assert!(parse_params("  ").is_empty());
        assert!(parse_params("void").is_empty());
    }
}

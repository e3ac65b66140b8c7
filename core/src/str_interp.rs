//! `#{name}` interpolation used by command templates and harness templates.
//!
//! `##` is an escaped `#`, so `##{name}` renders the literal text `#{name}`.
//! Variable values are inserted verbatim and never re-scanned.

use std::{borrow::Borrow, collections::HashMap, hash::Hash};

pub type Result = std::result::Result<String, InterpError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpError {
    #[error("Undefined variable '{0}' at {}", .1+1)]
    UndefinedVar(String, usize),

    #[error("Unclosed brace (found open brace at {})", .0+1)]
    UnclosedBrace(usize),
}

pub fn interp<K, V>(template: &str, variables: &HashMap<K, V>) -> Result
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
{
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum State {
        Text,
        Hash,
        Name,
    }
    use State::*;

    let mut state = Text;
    let mut open_at = 0;
    let mut out = String::with_capacity(template.len() + template.len() / 2);
    let mut name = String::with_capacity(32);

    for (i, c) in template.chars().enumerate() {
        match (c, state) {
            ('#', Text) => {
                state = Hash;
                out.push(c);
            }
            ('#', Hash) => {
                state = Text;
            }
            ('{', Hash) => {
                state = Name;
                open_at = i;
                name.clear();
                out.pop(); // drop the '#'
            }
            ('}', Name) => {
                state = Text;
                let Some(value) = variables.get(name.as_str()) else {
                    return Err(InterpError::UndefinedVar(name, open_at + 1));
                };
                out.push_str(value.as_ref());
            }
            (_, Name) => {
                name.push(c);
            }
            _ => {
                state = Text;
                out.push(c);
            }
        }
    }

    if state == Name {
        Err(InterpError::UnclosedBrace(open_at))
    } else {
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use maplit::hashmap;

    #[test]
    fn interp_ok() {
        let vars = hashmap! {
            "srcPath" => "/tmp/polyrun-x/main.cpp",
            "binPath" => "/tmp/polyrun-x/main",
            "code" => "#{not_a_var} ## kept",
        };

        assert_eq!(interp("g++", &vars).unwrap(), "g++");
        assert_eq!(interp("#{srcPath}", &vars).unwrap(), vars["srcPath"]);
        assert_eq!(
            interp("-o#{binPath}", &vars).unwrap(),
            "-o/tmp/polyrun-x/main"
        );
        assert_eq!(
            interp("#{binPath}#{srcPath}", &vars).unwrap(),
            format!("{}{}", vars["binPath"], vars["srcPath"])
        );
        assert_eq!(interp("#{code}", &vars).unwrap(), "#{not_a_var} ## kept");
        assert_eq!(interp("#include <map>", &vars).unwrap(), "#include <map>");
        assert_eq!(interp("# comment {x}", &vars).unwrap(), "# comment {x}");
        assert_eq!(interp("##{srcPath}", &vars).unwrap(), "#{srcPath}");
        assert_eq!(interp("#", &vars).unwrap(), "#");
        assert_eq!(interp("##", &vars).unwrap(), "#");
    }

    #[test]
    fn interp_ng() {
        let vars = hashmap! { "srcPath" => "main.py" };
        assert_eq!(
            interp("python3 #{file}", &vars).unwrap_err(),
            InterpError::UndefinedVar("file".to_owned(), 10)
        );
        assert_eq!(
            interp("#{srcPath} #{bin", &vars).unwrap_err(),
            InterpError::UnclosedBrace(12),
        );
    }
}

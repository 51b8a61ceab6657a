use crate::shell::ast::{Word, WordPart};
use crate::shell::vars::VarStore;

/// Resolves a word to its string value. Unset variables become `""`.
pub fn resolve(word: &Word, vars: &dyn VarStore) -> String {
    resolve_parts(&word.0, vars)
}

pub fn resolve_parts(parts: &[WordPart], vars: &dyn VarStore) -> String {
    let mut res = String::new();
    for part in parts {
        match part {
            WordPart::Literal(s) => res.push_str(s),
            WordPart::Variable(name) => {
                if let Some(val) = vars.get(name) {
                    res.push_str(&val);
                }
            }
        }
    }
    res
}

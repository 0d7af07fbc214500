/*
 * static_files.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Tagliacarte.
 *
 * Tagliacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This file is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this file.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Path-safety-checked file reads for `/static/*`, and `{{ key }}`
//! placeholder substitution for rendered templates.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Rejects a requested path segment containing `..` or a backslash, checked
/// against both the raw and percent-decoded forms (decode first, then check,
/// so `%2e%2e` can't sneak past).
pub fn is_safe_path(requested: &str) -> bool {
    let decoded = percent_encoding::percent_decode_str(requested).decode_utf8_lossy();
    !decoded.contains("..") && !decoded.contains('\\')
}

pub fn read_static(static_dir: &str, requested: &str) -> Option<Vec<u8>> {
    if !is_safe_path(requested) {
        return None;
    }
    let decoded = percent_encoding::percent_decode_str(requested).decode_utf8_lossy();
    let path: PathBuf = Path::new(static_dir).join(decoded.trim_start_matches('/'));
    fs::read(path).ok()
}

/// Read a template and substitute `{{ key }}` placeholders (whitespace around
/// the key is ignored) against the given variable set. A placeholder with no
/// matching variable is left untouched.
pub fn render_template(template_dir: &str, name: &str, vars: &HashMap<String, String>) -> Option<String> {
    let path = Path::new(template_dir).join(name);
    let text = fs::read_to_string(path).ok()?;
    Some(substitute(&text, vars))
}

fn substitute(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let key = after[..end].trim();
        match vars.get(key) {
            Some(value) => out.push_str(value),
            None => {
                out.push_str("{{");
                out.push_str(&after[..end]);
                out.push_str("}}");
            }
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dot_dot_traversal() {
        assert!(!is_safe_path("../secret"));
        assert!(!is_safe_path("a/../../secret"));
    }

    #[test]
    fn rejects_percent_encoded_traversal() {
        assert!(!is_safe_path("..%2Fsecret"));
        assert!(!is_safe_path("%2e%2e/secret"));
    }

    #[test]
    fn rejects_backslashes() {
        assert!(!is_safe_path("a\\b"));
    }

    #[test]
    fn accepts_legal_nested_path() {
        assert!(is_safe_path("css/app.css"));
    }

    #[test]
    fn substitutes_whitespace_insensitive_placeholders() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "world".to_string());
        assert_eq!(substitute("hello {{ name }}!", &vars), "hello world!");
        assert_eq!(substitute("hello {{name}}!", &vars), "hello world!");
    }

    #[test]
    fn leaves_unmatched_placeholders_untouched() {
        let vars = HashMap::new();
        assert_eq!(substitute("hi {{ missing }}", &vars), "hi {{ missing }}");
    }
}

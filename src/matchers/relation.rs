//! Rails relation matcher (belongs_to, has_one, has_many)
//!
//! A relation declaration produces a pseudo-symbol whose `target_name` points
//! at the related class: taken from `class_name:` when present, otherwise
//! inferred from the relation name (singularized for `has_many`, then
//! converted to PascalCase). Definition lookups follow the target.

use regex::Regex;
use std::sync::LazyLock;

use crate::matchers::{MatchResult, Matcher, ParseContext};
use crate::models::{Symbol, SymbolKind};

// belongs_to :owner, class_name: 'Person'
// The class_name capture requires quotes balanced on the logical line, so
// multi-line declarations must be folded by the assembler first.
static RELATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(belongs_to|has_one|has_many)\s*[(\s]+:([a-z_][a-z0-9_]*)(?:.*class_name:\s*['"]([A-Za-z][A-Za-z0-9_:]*)['"])?"#,
    )
    .expect("relation pattern")
});

// has_many( ... spanning multiple physical lines
static MULTILINE_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(belongs_to|has_one|has_many)\s*\(").expect("relation multiline pattern")
});

/// Extracts Rails relation declarations inside class/module bodies
pub struct RelationMatcher;

impl Matcher for RelationMatcher {
    fn name(&self) -> &'static str {
        "relation"
    }

    fn priority(&self) -> i32 {
        85
    }

    fn try_match(&self, line: &str, ctx: &ParseContext) -> Option<MatchResult> {
        // Relations only make sense inside a class or module body
        if ctx.current_scope.is_empty() {
            return None;
        }

        let caps = RELATION_RE.captures(line)?;
        let relation_type = caps.get(1)?.as_str();
        let relation_name = caps.get(2)?.as_str();
        let class_name = caps.get(3).map(|m| m.as_str());

        let target = match class_name {
            Some(explicit) => explicit.to_string(),
            None => to_class_name(relation_name, relation_type == "has_many"),
        };

        let needle = format!(":{}", relation_name);
        let column = line.find(&needle).map(|i| i + 1).unwrap_or(0);

        let mut sym = Symbol {
            name: relation_name.to_string(),
            kind: SymbolKind::Relation,
            file_path: ctx.file_path.to_string(),
            line: ctx.line_num,
            column,
            scope: ctx.current_scope.to_vec(),
            target_name: Some(target),
            ..Default::default()
        };
        sym.full_name = sym.compute_full_name();

        Some(MatchResult {
            symbols: vec![sym],
            ..Default::default()
        })
    }

    fn starts_multiline(&self, line: &str) -> Option<(char, char)> {
        if !MULTILINE_START_RE.is_match(line) {
            return None;
        }

        let opens = line.matches('(').count();
        let closes = line.matches(')').count();
        if opens > closes {
            Some(('(', ')'))
        } else {
            None
        }
    }
}

/// Convert a snake_case relation name to a PascalCase class name,
/// singularizing the final segment when requested
fn to_class_name(name: &str, singularize: bool) -> String {
    let mut parts: Vec<String> = name.split('_').map(|p| p.to_string()).collect();

    // business_people → business_person: only the last segment singularizes
    if singularize {
        if let Some(last) = parts.last_mut() {
            *last = singular(last);
        }
    }

    parts
        .iter()
        .map(|p| {
            let mut chars = p.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Reduce a plural English word to its singular form
fn singular(word: &str) -> String {
    match word {
        "people" => return "person".to_string(),
        "children" => return "child".to_string(),
        "men" => return "man".to_string(),
        "women" => return "woman".to_string(),
        "teeth" => return "tooth".to_string(),
        "feet" => return "foot".to_string(),
        "mice" => return "mouse".to_string(),
        "geese" => return "goose".to_string(),
        _ => {}
    }

    if word.ends_with("ies") && word.len() > 3 {
        return format!("{}y", &word[..word.len() - 3]); // companies → company
    }
    if word.ends_with("ves") && word.len() > 3 {
        return format!("{}f", &word[..word.len() - 3]); // leaves → leaf
    }
    if word.ends_with("ses")
        || word.ends_with("xes")
        || word.ends_with("zes")
        || word.ends_with("ches")
        || word.ends_with("shes")
    {
        return word[..word.len() - 2].to_string(); // boxes → box
    }
    if word.ends_with('s') && word.len() > 1 {
        return word[..word.len() - 1].to_string(); // comments → comment
    }

    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(scope: &'a [String]) -> ParseContext<'a> {
        ParseContext {
            file_path: "/test/model.rb",
            current_scope: scope,
            line_num: 10,
            current_method: None,
        }
    }

    fn scope_of(name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    #[test]
    fn test_relation_matches() {
        struct Case {
            line: &'static str,
            scope: &'static str,
            want_name: &'static str,
            want_target: &'static str,
        }

        let cases = [
            Case {
                line: "  belongs_to :address",
                scope: "User",
                want_name: "address",
                want_target: "Address",
            },
            Case {
                line: "  belongs_to :owner, class_name: 'Person'",
                scope: "User",
                want_name: "owner",
                want_target: "Person",
            },
            Case {
                line: r#"  belongs_to :owner, class_name: "Person""#,
                scope: "User",
                want_name: "owner",
                want_target: "Person",
            },
            Case {
                line: "  has_one :business_structure",
                scope: "Company",
                want_name: "business_structure",
                want_target: "BusinessStructure",
            },
            Case {
                line: "  has_many :comments",
                scope: "Post",
                want_name: "comments",
                want_target: "Comment",
            },
            Case {
                line: "  has_many :posts, class_name: 'Article'",
                scope: "User",
                want_name: "posts",
                want_target: "Article",
            },
            Case {
                line: "  belongs_to :user, class_name: 'Spanner::CheckbookUser'",
                scope: "Account",
                want_name: "user",
                want_target: "Spanner::CheckbookUser",
            },
            Case {
                line: "  belongs_to :author, class_name: 'User', foreign_key: :user_id",
                scope: "Post",
                want_name: "author",
                want_target: "User",
            },
            Case {
                line: "  has_many :people",
                scope: "Company",
                want_name: "people",
                want_target: "Person",
            },
            Case {
                line: "  has_many :companies",
                scope: "User",
                want_name: "companies",
                want_target: "Company",
            },
            Case {
                line: "  has_many :boxes",
                scope: "Warehouse",
                want_name: "boxes",
                want_target: "Box",
            },
            Case {
                line: "  has_many :business_people",
                scope: "Company",
                want_name: "business_people",
                want_target: "BusinessPerson",
            },
        ];

        for case in cases {
            let scope = scope_of(case.scope);
            let result = RelationMatcher
                .try_match(case.line, &ctx(&scope))
                .unwrap_or_else(|| panic!("expected match for {:?}", case.line));

            assert_eq!(result.symbols.len(), 1, "line: {}", case.line);
            let sym = &result.symbols[0];
            assert_eq!(sym.name, case.want_name, "line: {}", case.line);
            assert_eq!(
                sym.target_name.as_deref(),
                Some(case.want_target),
                "line: {}",
                case.line
            );
            assert_eq!(sym.kind, SymbolKind::Relation, "line: {}", case.line);
        }
    }

    #[test]
    fn test_no_match_outside_class() {
        assert!(RelationMatcher
            .try_match("  belongs_to :address", &ctx(&[]))
            .is_none());
    }

    #[test]
    fn test_no_match_for_other_dsl() {
        let scope = scope_of("User");
        assert!(RelationMatcher
            .try_match("  validates :email", &ctx(&scope))
            .is_none());
    }

    #[test]
    fn test_starts_multiline() {
        assert_eq!(
            RelationMatcher.starts_multiline("  has_many("),
            Some(('(', ')'))
        );
        assert_eq!(
            RelationMatcher.starts_multiline("  belongs_to(:a, class_name: 'B')"),
            None
        );
        assert_eq!(RelationMatcher.starts_multiline("  has_many :items"), None);
    }

    #[test]
    fn test_singular() {
        let cases = [
            ("comments", "comment"),
            ("posts", "post"),
            ("companies", "company"),
            ("boxes", "box"),
            ("watches", "watch"),
            ("addresses", "address"),
            ("people", "person"),
            ("children", "child"),
            ("leaves", "leaf"),
            ("mice", "mouse"),
            ("user", "user"),
        ];

        for (input, expected) in cases {
            assert_eq!(singular(input), expected, "singular({:?})", input);
        }
    }

    #[test]
    fn test_to_class_name() {
        let cases = [
            ("address", false, "Address"),
            ("business_structure", false, "BusinessStructure"),
            ("comments", true, "Comment"),
            ("user_profiles", true, "UserProfile"),
            ("person", false, "Person"),
        ];

        for (input, singularize, expected) in cases {
            assert_eq!(
                to_class_name(input, singularize),
                expected,
                "to_class_name({:?}, {})",
                input,
                singularize
            );
        }
    }
}

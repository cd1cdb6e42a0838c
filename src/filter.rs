//! Wildcard name matching for members and classes.

/// Pattern for member names and descriptors: `*` matches any run, `?` matches one character.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NamePattern {
    pattern: Vec<char>,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.chars().collect(),
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let candidate: Vec<char> = candidate.chars().collect();
        match_tokens(&self.pattern, &candidate)
    }
}

/// Whether a member name or descriptor needs pattern matching instead of an exact comparison.
pub fn has_wildcards(value: &str) -> bool {
    value.contains(['*', '?'])
}

/// Matches `value` against `pattern`, comparing exactly when the pattern has no wildcards.
pub fn matches_member_pattern(pattern: &str, value: &str) -> bool {
    if has_wildcards(pattern) {
        NamePattern::new(pattern).matches(value)
    } else {
        pattern == value
    }
}

/// Comma separated class name filter in internal form.
///
/// `**` matches any run of characters, `*` any run without `/`, `?` a single character other
/// than `/`. A leading `!` negates an entry. The first matching entry decides; when no entry
/// matches, the result is the negation flag of the last entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassNameFilter {
    entries: Vec<FilterEntry>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct FilterEntry {
    negated: bool,
    tokens: Vec<Token>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Token {
    Literal(char),
    AnyInPackage,
    AnyAcrossPackages,
    OneInPackage,
}

impl ClassNameFilter {
    pub fn parse(filter: &str) -> Self {
        let entries = filter
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (negated, body) = match entry.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, entry),
                };
                FilterEntry {
                    negated,
                    tokens: tokenize(&body.replace('.', "/")),
                }
            })
            .collect();
        Self { entries }
    }

    pub fn matches(&self, class_name: &str) -> bool {
        let chars: Vec<char> = class_name.chars().collect();
        for entry in &self.entries {
            if match_class_tokens(&entry.tokens, &chars) {
                return !entry.negated;
            }
        }
        self.entries.last().map(|entry| entry.negated).unwrap_or(false)
    }
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut index = 0;
    while index < chars.len() {
        match chars[index] {
            '*' if chars.get(index + 1) == Some(&'*') => {
                tokens.push(Token::AnyAcrossPackages);
                index += 2;
                continue;
            }
            '*' => tokens.push(Token::AnyInPackage),
            '?' => tokens.push(Token::OneInPackage),
            other => tokens.push(Token::Literal(other)),
        }
        index += 1;
    }
    tokens
}

fn match_class_tokens(tokens: &[Token], candidate: &[char]) -> bool {
    let Some((first, rest)) = tokens.split_first() else {
        return candidate.is_empty();
    };
    match first {
        Token::Literal(expected) => {
            candidate.first() == Some(expected) && match_class_tokens(rest, &candidate[1..])
        }
        Token::OneInPackage => {
            matches!(candidate.first(), Some(c) if *c != '/')
                && match_class_tokens(rest, &candidate[1..])
        }
        Token::AnyInPackage => {
            for split in 0..=candidate.len() {
                if match_class_tokens(rest, &candidate[split..]) {
                    return true;
                }
                if candidate.get(split) == Some(&'/') {
                    break;
                }
            }
            false
        }
        Token::AnyAcrossPackages => {
            (0..=candidate.len()).any(|split| match_class_tokens(rest, &candidate[split..]))
        }
    }
}

fn match_tokens(pattern: &[char], candidate: &[char]) -> bool {
    let Some((first, rest)) = pattern.split_first() else {
        return candidate.is_empty();
    };
    match first {
        '*' => (0..=candidate.len()).any(|split| match_tokens(rest, &candidate[split..])),
        '?' => !candidate.is_empty() && match_tokens(rest, &candidate[1..]),
        literal => candidate.first() == Some(literal) && match_tokens(rest, &candidate[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_pattern_matches_runs_and_single_characters() {
        let pattern = NamePattern::new("get*");
        assert!(pattern.matches("getName"));
        assert!(pattern.matches("get"));
        assert!(!pattern.matches("setName"));

        let pattern = NamePattern::new("(?)V");
        assert!(pattern.matches("(I)V"));
        assert!(!pattern.matches("(II)V"));
    }

    #[test]
    fn member_pattern_without_wildcards_is_exact() {
        assert!(matches_member_pattern("run", "run"));
        assert!(!matches_member_pattern("run", "running"));
        assert!(matches_member_pattern("run*", "running"));
    }

    #[test]
    fn class_filter_single_star_stays_in_package() {
        let filter = ClassNameFilter::parse("com/example/*");
        assert!(filter.matches("com/example/Foo"));
        assert!(!filter.matches("com/example/sub/Foo"));

        let filter = ClassNameFilter::parse("com.example.**");
        assert!(filter.matches("com/example/sub/Foo"));
    }

    #[test]
    fn class_filter_negation_uses_first_match() {
        let filter = ClassNameFilter::parse("!com/example/Keep,com/example/**");
        assert!(!filter.matches("com/example/Keep"));
        assert!(filter.matches("com/example/Other"));
        assert!(!filter.matches("org/other/Type"));

        let filter = ClassNameFilter::parse("!java/**");
        assert!(filter.matches("com/example/Foo"));
        assert!(!filter.matches("java/lang/Object"));
    }
}

//! Article range tokens and wildmat name matching (§4.7).

/// A parsed NNTP range token: `n`, `n-`, or `n-m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleRange {
    /// A single article number.
    Single(u64),
    /// `n-`: from `n` to the group's high watermark, unbounded here.
    From(u64),
    /// `n-m`: both endpoints inclusive, `n <= m`.
    Bounded(u64, u64),
}

impl ArticleRange {
    /// Parse a range token. Returns `None` on anything malformed, including
    /// a bounded range where the low end exceeds the high end.
    pub fn parse(token: &str) -> Option<Self> {
        if token.is_empty() {
            return None;
        }
        match token.split_once('-') {
            None => token.parse().ok().map(ArticleRange::Single),
            Some((low, "")) => low.parse().ok().map(ArticleRange::From),
            Some((low, high)) => {
                let low: u64 = low.parse().ok()?;
                let high: u64 = high.parse().ok()?;
                (low <= high).then_some(ArticleRange::Bounded(low, high))
            }
        }
    }

    /// Resolve this range against a concrete high watermark, returning an
    /// inclusive `(low, high)` bound.
    pub fn resolve(&self, high_watermark: u64) -> (u64, u64) {
        match *self {
            ArticleRange::Single(n) => (n, n),
            ArticleRange::From(n) => (n, high_watermark),
            ArticleRange::Bounded(n, m) => (n, m),
        }
    }
}

/// A compiled wildmat pattern set (RFC 3977 §4.2): comma-separated glob
/// patterns optionally prefixed with `!` to invert; later patterns take
/// precedence over earlier ones.
#[derive(Debug, Clone)]
pub struct Wildmat {
    terms: Vec<(bool, Vec<GlobToken>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GlobToken {
    Star,
    Question,
    Class(Vec<ClassItem>, bool),
    Literal(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

impl Wildmat {
    /// Compile a comma-separated wildmat pattern string.
    pub fn compile(pattern: &str) -> Self {
        let terms = pattern
            .split(',')
            .map(|raw| {
                let raw = raw.trim();
                if let Some(rest) = raw.strip_prefix('!') {
                    (true, compile_glob(rest))
                } else {
                    (false, compile_glob(raw))
                }
            })
            .collect();
        Self { terms }
    }

    /// Match `name` against the compiled pattern set. Left-to-right, last
    /// matching term wins; if no term matches, the result is `false`.
    ///
    /// The standalone pattern `!*` is a special case (§4.2, §8): taken
    /// through the general algorithm a negated `*` would clear the result
    /// for every name, matching none of them. The wildmat grammar defines
    /// it instead as matching iff `name` is empty, so it is checked before
    /// falling back to the general term loop.
    pub fn matches(&self, name: &str) -> bool {
        if self.is_standalone_negated_star() {
            return name.is_empty();
        }
        let mut result = false;
        for (negate, tokens) in &self.terms {
            if glob_match(tokens, name) {
                result = !*negate;
            }
        }
        result
    }

    fn is_standalone_negated_star(&self) -> bool {
        matches!(self.terms.as_slice(), [(true, tokens)] if tokens.as_slice() == [GlobToken::Star])
    }
}

fn compile_glob(pattern: &str) -> Vec<GlobToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => tokens.push(GlobToken::Star),
            '?' => tokens.push(GlobToken::Question),
            '[' => {
                let mut items = Vec::new();
                let mut negate = false;
                if chars.peek() == Some(&'^') || chars.peek() == Some(&'!') {
                    negate = true;
                    chars.next();
                }
                while let Some(&c) = chars.peek() {
                    if c == ']' {
                        chars.next();
                        break;
                    }
                    chars.next();
                    if chars.peek() == Some(&'-') {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        if let Some(&end) = lookahead.peek() {
                            if end != ']' {
                                chars.next();
                                chars.next();
                                items.push(ClassItem::Range(c, end));
                                continue;
                            }
                        }
                    }
                    items.push(ClassItem::Char(c));
                }
                tokens.push(GlobToken::Class(items, negate));
            }
            other => tokens.push(GlobToken::Literal(other)),
        }
    }
    tokens
}

fn glob_match(tokens: &[GlobToken], text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    match_from(tokens, 0, &chars, 0)
}

fn match_from(tokens: &[GlobToken], ti: usize, text: &[char], si: usize) -> bool {
    if ti == tokens.len() {
        return si == text.len();
    }
    match &tokens[ti] {
        GlobToken::Star => {
            for skip in si..=text.len() {
                if match_from(tokens, ti + 1, text, skip) {
                    return true;
                }
            }
            false
        }
        GlobToken::Question => si < text.len() && match_from(tokens, ti + 1, text, si + 1),
        GlobToken::Literal(c) => si < text.len() && text[si] == *c && match_from(tokens, ti + 1, text, si + 1),
        GlobToken::Class(items, negate) => {
            if si >= text.len() {
                return false;
            }
            let member = items.iter().any(|item| match item {
                ClassItem::Char(c) => *c == text[si],
                ClassItem::Range(lo, hi) => *lo <= text[si] && text[si] <= *hi,
            });
            (member != *negate) && match_from(tokens, ti + 1, text, si + 1)
        }
    }
}

//! Seeded constraint-propagation generator for User-Agent identities.
//!
//! An identity is a row of slots. Each slot starts with every admissible
//! token; slots are collapsed left to right to one randomly chosen token, and
//! every collapse filters the slots to its right through the grammar in
//! [`super::grammar`]. Generation ends at the last slot or at the first slot
//! left with no possibilities.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::grammar::compatible;
use super::token::{Token, TokenKind};

/// Number of slots used when none is configured.
pub const DEFAULT_IDENTITY_LENGTH: usize = 20;

/// Restricts which tokens a generated identity may contain.
///
/// An empty filter admits every token. A non-empty filter should admit
/// [`Token::ROOT`]; the first slot is pinned to it regardless.
#[derive(Clone, Default)]
pub enum TokenFilter {
    /// Every token is admissible.
    #[default]
    Any,
    /// Only the listed tokens.
    Tokens(Vec<Token>),
    /// Only tokens of the listed kinds.
    Kinds(Vec<TokenKind>),
    /// Tokens accepted by the predicate.
    Predicate(Arc<dyn Fn(Token) -> bool + Send + Sync>),
}

impl TokenFilter {
    /// Admit every token.
    pub fn any() -> Self {
        Self::Any
    }

    /// Admit exactly the given tokens. An empty list admits everything.
    pub fn allow(tokens: impl IntoIterator<Item = Token>) -> Self {
        let tokens: Vec<Token> = tokens.into_iter().collect();
        if tokens.is_empty() {
            Self::Any
        } else {
            Self::Tokens(tokens)
        }
    }

    /// Admit every token of the given kinds.
    pub fn kinds(kinds: impl IntoIterator<Item = TokenKind>) -> Self {
        let kinds: Vec<TokenKind> = kinds.into_iter().collect();
        if kinds.is_empty() {
            Self::Any
        } else {
            Self::Kinds(kinds)
        }
    }

    /// Admit tokens accepted by `f`.
    pub fn predicate(f: impl Fn(Token) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Whether `token` may appear in a generated identity.
    pub fn allows(&self, token: Token) -> bool {
        match self {
            Self::Any => true,
            Self::Tokens(tokens) => tokens.contains(&token),
            Self::Kinds(kinds) => kinds.contains(&token.kind()),
            Self::Predicate(f) => f(token),
        }
    }
}

impl fmt::Debug for TokenFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Tokens(tokens) => f.debug_tuple("Tokens").field(tokens).finish(),
            Self::Kinds(kinds) => f.debug_tuple("Kinds").field(kinds).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A generated browser identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Collapsed tokens in slot order.
    pub tokens: Vec<Token>,
    /// Space-joined rendering of `tokens`, the User-Agent header value.
    pub user_agent: String,
    /// Browser client, e.g. `Firefox`, `FxiOS` or `Safari`.
    pub client: Option<String>,
    /// Browser version, e.g. `105.0`.
    pub version: Option<String>,
}

impl Identity {
    /// Whether both client and version were populated.
    ///
    /// A restrictive filter can truncate generation before the browser token.
    pub fn is_complete(&self) -> bool {
        self.client.is_some() && self.version.is_some()
    }
}

/// One position of the identity being generated.
#[derive(Debug)]
struct TokenSlot {
    possibilities: Vec<Token>,
    rng: StdRng,
}

impl TokenSlot {
    fn new(seed: u64, index: usize, filter: &TokenFilter) -> Self {
        let possibilities = Token::ALL
            .iter()
            .copied()
            .filter(|t| filter.allows(*t))
            .collect();
        Self {
            possibilities,
            rng: StdRng::seed_from_u64(slot_seed(seed, index)),
        }
    }

    /// Pick one remaining possibility. `None` when nothing fits.
    fn collapse(&mut self) -> Option<Token> {
        if self.possibilities.is_empty() {
            return None;
        }
        let pick = self.possibilities[self.rng.gen_range(0..self.possibilities.len())];
        self.possibilities.clear();
        self.possibilities.push(pick);
        Some(pick)
    }

    /// Keep only tokens that can follow some token still possible in `prev`.
    fn observe(&mut self, collapsed: Token, prev: &[Token]) {
        self.possibilities
            .retain(|current| prev.iter().any(|p| compatible(collapsed, *p, *current)));
    }
}

/// SplitMix64 over the generation seed and slot index.
fn slot_seed(seed: u64, index: usize) -> u64 {
    let mut z = seed.wrapping_add((index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Generate one identity of at most `length` tokens.
///
/// Identical `(length, seed, filter)` inputs always produce the same identity.
pub fn generate(length: usize, seed: u64, filter: &TokenFilter) -> Identity {
    let mut slots: Vec<TokenSlot> = (0..length)
        .map(|index| TokenSlot::new(seed, index, filter))
        .collect();
    if let Some(first) = slots.first_mut() {
        first.possibilities = vec![Token::ROOT];
    }

    let mut identity = Identity {
        tokens: Vec::with_capacity(length),
        user_agent: String::new(),
        client: None,
        version: None,
    };

    for i in 0..slots.len() {
        let Some(collapsed) = slots[i].collapse() else {
            break;
        };

        if i > 0 {
            identity.user_agent.push(' ');
        }
        identity.user_agent.push_str(collapsed.as_str());
        identity.tokens.push(collapsed);

        if let (Some(client), Some(version)) = (collapsed.client(), collapsed.version()) {
            identity.client = Some(client.to_string());
            identity.version = Some(version.to_string());
        }

        for j in i + 1..slots.len() {
            let (left, right) = slots.split_at_mut(j);
            right[0].observe(collapsed, &left[j - 1].possibilities);
        }
    }

    debug_assert!(identity.tokens.is_empty() || identity.tokens[0] == Token::ROOT);
    identity
}

/// Reusable generator configuration.
#[derive(Debug, Clone)]
pub struct Generator {
    length: usize,
    filter: TokenFilter,
}

impl Generator {
    /// Generator with the default length and no filter.
    pub fn new() -> Self {
        Self {
            length: DEFAULT_IDENTITY_LENGTH,
            filter: TokenFilter::Any,
        }
    }

    /// Set the number of slots.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Set the token filter.
    pub fn with_filter(mut self, filter: TokenFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn filter(&self) -> &TokenFilter {
        &self.filter
    }

    /// Generate the identity for `seed`.
    pub fn generate(&self, seed: u64) -> Identity {
        generate(self.length, seed, &self.filter)
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux_firefox_105() -> TokenFilter {
        TokenFilter::allow([
            Token::Mozilla5,
            Token::X11,
            Token::Linux,
            Token::X86_64,
            Token::Revision105,
            Token::Gecko20100101,
            Token::Firefox105,
        ])
    }

    #[test]
    fn test_collapse_picks_from_possibilities() {
        let filter = TokenFilter::allow([Token::Linux, Token::Macintosh]);
        let mut slot = TokenSlot::new(42, 0, &filter);
        let picked = slot.collapse().unwrap();
        assert!(picked == Token::Linux || picked == Token::Macintosh);
        assert_eq!(slot.possibilities, vec![picked]);
    }

    #[test]
    fn test_collapse_empty_slot() {
        let mut slot = TokenSlot::new(42, 0, &TokenFilter::any());
        slot.possibilities.clear();
        assert_eq!(slot.collapse(), None);
    }

    #[test]
    fn test_observe_filters_through_grammar() {
        let mut slot = TokenSlot::new(7, 3, &TokenFilter::kinds([TokenKind::ProcessorArchitecture]));
        slot.observe(Token::Linux, &[Token::Linux]);
        assert_eq!(slot.possibilities, vec![Token::X86_64]);
    }

    #[test]
    fn test_observe_never_grows() {
        let mut slot = TokenSlot::new(7, 3, &TokenFilter::allow([Token::X64]));
        slot.observe(Token::Linux, &[Token::Linux, Token::Win64]);
        assert_eq!(slot.possibilities, vec![Token::X64]);
    }

    #[test]
    fn test_linux_firefox_105() {
        let identity = generate(DEFAULT_IDENTITY_LENGTH, 1695575963768825450, &linux_firefox_105());
        assert_eq!(
            identity.user_agent,
            "Mozilla/5.0 (X11; Linux x86_64; rv:105.0) Gecko/20100101 Firefox/105.0"
        );
        assert_eq!(identity.client.as_deref(), Some("Firefox"));
        assert_eq!(identity.version.as_deref(), Some("105.0"));
        assert!(identity.is_complete());
    }

    #[test]
    fn test_deterministic() {
        for seed in [0, 1, 42, 1695290468933462166, u64::MAX] {
            assert_eq!(
                generate(DEFAULT_IDENTITY_LENGTH, seed, &TokenFilter::any()),
                generate(DEFAULT_IDENTITY_LENGTH, seed, &TokenFilter::any())
            );
        }
    }

    #[test]
    fn test_first_token_is_root() {
        for seed in 0..50 {
            let identity = generate(DEFAULT_IDENTITY_LENGTH, seed, &TokenFilter::any());
            assert_eq!(identity.tokens[0], Token::ROOT);
        }
    }

    #[test]
    fn test_short_length_truncates() {
        let identity = generate(3, 9, &linux_firefox_105());
        assert_eq!(identity.user_agent, "Mozilla/5.0 (X11; Linux");
        assert!(!identity.is_complete());
    }

    #[test]
    fn test_zero_length() {
        let identity = generate(0, 9, &TokenFilter::any());
        assert!(identity.tokens.is_empty());
        assert!(identity.user_agent.is_empty());
    }

    #[test]
    fn test_filter_dead_end_truncates() {
        // Gecko is not allowed, so the branch ends after the revision.
        let filter = TokenFilter::allow([
            Token::Mozilla5,
            Token::X11,
            Token::Linux,
            Token::X86_64,
            Token::Revision105,
            Token::Firefox105,
        ]);
        let identity = generate(DEFAULT_IDENTITY_LENGTH, 5, &filter);
        assert_eq!(identity.user_agent, "Mozilla/5.0 (X11; Linux x86_64; rv:105.0)");
        assert_eq!(identity.client, None);
        assert_eq!(identity.version, None);
    }

    #[test]
    fn test_predicate_filter() {
        // Every surviving branch has to reach Firefox 105: versioned Gecko
        // tokens are pinned and the WebKit platforms are removed outright.
        let filter = TokenFilter::predicate(|t| {
            !matches!(t, Token::IPhone | Token::IPad)
                && !matches!(
                    t.kind(),
                    TokenKind::MacOs
                        | TokenKind::Safari
                        | TokenKind::FirefoxMobile
                        | TokenKind::Android
                )
                && (!matches!(t.kind(), TokenKind::Revision | TokenKind::Firefox)
                    || t.version() == Some("105.0"))
        });
        for seed in 0..100 {
            let identity = generate(DEFAULT_IDENTITY_LENGTH, seed, &filter);
            assert_eq!(identity.client.as_deref(), Some("Firefox"), "{}", identity.user_agent);
            assert_eq!(identity.version.as_deref(), Some("105.0"), "{}", identity.user_agent);
        }
    }

    #[test]
    fn test_generator_matches_free_function() {
        let generator = Generator::new().with_filter(linux_firefox_105());
        assert_eq!(generator.length(), DEFAULT_IDENTITY_LENGTH);
        assert_eq!(
            generator.generate(11),
            generate(DEFAULT_IDENTITY_LENGTH, 11, &linux_firefox_105())
        );
    }
}

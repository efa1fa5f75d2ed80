use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Produces a compound polarity in `[-1, 1]` for a piece of text.
///
/// Implementations must be deterministic and total: any input, including an
/// empty string, yields a value and never panics.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;
}

/// Normalisation constant for the compound score, `x / sqrt(x² + α)`.
const ALPHA: f64 = 15.0;
const BOOSTER_INCREMENT: f64 = 0.293;
const CAPS_INCREMENT: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_INCREMENT: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;

const LEXICON: &[(&str, f64)] = &[
    // positive
    ("good", 1.9),
    ("great", 3.1),
    ("excellent", 3.2),
    ("strong", 2.3),
    ("stronger", 2.1),
    ("gain", 2.4),
    ("gains", 2.4),
    ("gained", 2.0),
    ("beat", 1.2),
    ("beats", 1.2),
    ("rally", 2.0),
    ("rallies", 2.0),
    ("rallied", 2.0),
    ("soar", 2.3),
    ("soars", 2.3),
    ("soared", 2.3),
    ("jump", 1.0),
    ("jumps", 1.0),
    ("jumped", 1.0),
    ("rise", 1.0),
    ("rises", 1.0),
    ("rose", 1.0),
    ("boom", 2.1),
    ("bullish", 2.3),
    ("upgrade", 1.8),
    ("upgraded", 1.8),
    ("profit", 1.8),
    ("profits", 1.8),
    ("profitable", 2.0),
    ("growth", 1.7),
    ("success", 2.7),
    ("successful", 2.8),
    ("win", 2.8),
    ("wins", 2.7),
    ("won", 2.7),
    ("outperform", 1.9),
    ("outperformed", 1.9),
    ("optimistic", 2.2),
    ("optimism", 2.4),
    ("positive", 2.6),
    ("happy", 2.7),
    ("love", 3.2),
    ("best", 3.2),
    ("better", 1.9),
    ("improve", 1.9),
    ("improved", 2.1),
    ("improvement", 2.0),
    ("recovery", 1.4),
    ("recover", 1.4),
    ("recovered", 1.5),
    ("breakthrough", 2.2),
    ("innovative", 2.1),
    ("approve", 1.7),
    ("approved", 1.8),
    ("approval", 1.5),
    ("boost", 1.7),
    ("boosts", 1.7),
    ("boosted", 1.7),
    ("upbeat", 1.9),
    ("robust", 1.6),
    ("confident", 2.2),
    ("confidence", 2.3),
    ("opportunity", 1.6),
    ("exceed", 1.4),
    ("exceeds", 1.4),
    ("exceeded", 1.5),
    ("record", 0.8),
    ("surge", 1.6),
    ("surges", 1.6),
    ("surged", 1.6),
    // negative
    ("bad", -2.5),
    ("poor", -2.1),
    ("weak", -1.9),
    ("weaker", -1.8),
    ("loss", -1.3),
    ("losses", -1.6),
    ("lose", -1.7),
    ("lost", -1.3),
    ("crash", -2.6),
    ("crashes", -2.6),
    ("crashed", -2.6),
    ("plunge", -2.2),
    ("plunges", -2.2),
    ("plunged", -2.2),
    ("fall", -1.0),
    ("falls", -1.0),
    ("fell", -1.0),
    ("drop", -1.1),
    ("drops", -1.1),
    ("dropped", -1.1),
    ("decline", -1.3),
    ("declines", -1.3),
    ("declined", -1.3),
    ("slump", -2.0),
    ("slumps", -2.0),
    ("tumble", -1.8),
    ("tumbles", -1.8),
    ("tumbled", -1.8),
    ("bearish", -2.0),
    ("downgrade", -1.8),
    ("downgraded", -1.8),
    ("miss", -1.2),
    ("misses", -1.2),
    ("missed", -1.2),
    ("fear", -2.2),
    ("fears", -2.2),
    ("worry", -1.9),
    ("worries", -1.9),
    ("concern", -1.4),
    ("concerns", -1.4),
    ("risk", -1.1),
    ("risks", -1.1),
    ("lawsuit", -1.6),
    ("sued", -1.9),
    ("fraud", -3.0),
    ("scandal", -2.6),
    ("bankruptcy", -3.0),
    ("bankrupt", -3.1),
    ("layoff", -2.0),
    ("layoffs", -2.1),
    ("cut", -1.1),
    ("cuts", -1.1),
    ("warning", -1.4),
    ("warns", -1.4),
    ("recession", -2.4),
    ("crisis", -3.1),
    ("collapse", -2.7),
    ("collapsed", -2.7),
    ("selloff", -1.9),
    ("volatile", -1.1),
    ("volatility", -1.0),
    ("uncertainty", -1.4),
    ("disappoint", -2.0),
    ("disappointed", -1.9),
    ("disappointing", -2.2),
    ("fail", -2.5),
    ("fails", -2.5),
    ("failed", -2.3),
    ("failure", -2.9),
    ("negative", -2.7),
    ("terrible", -3.0),
    ("worst", -3.1),
    ("worse", -2.1),
    ("pessimistic", -2.0),
    ("debt", -1.4),
    ("default", -1.6),
    ("probe", -1.0),
    ("investigation", -1.2),
    ("recall", -1.0),
    ("halt", -1.2),
    ("halted", -1.2),
];

const BOOSTERS: &[(&str, f64)] = &[
    ("very", BOOSTER_INCREMENT),
    ("extremely", BOOSTER_INCREMENT),
    ("highly", BOOSTER_INCREMENT),
    ("significantly", BOOSTER_INCREMENT),
    ("sharply", BOOSTER_INCREMENT),
    ("really", BOOSTER_INCREMENT),
    ("hugely", BOOSTER_INCREMENT),
    ("most", BOOSTER_INCREMENT),
    ("so", BOOSTER_INCREMENT),
    ("slightly", -BOOSTER_INCREMENT),
    ("somewhat", -BOOSTER_INCREMENT),
    ("marginally", -BOOSTER_INCREMENT),
    ("barely", -BOOSTER_INCREMENT),
    ("modestly", -BOOSTER_INCREMENT),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nor", "neither", "without", "hardly", "cannot", "isn't",
    "aren't", "wasn't", "weren't", "don't", "doesn't", "didn't", "won't", "can't", "couldn't",
    "shouldn't", "wouldn't",
];

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}]+)*").expect("valid regex"))
}

/// Rule-based lexicon scorer in the VADER tradition: per-word valences,
/// intensity boosters, negation within three words, emphasis from capitals
/// and exclamation marks, and contrast around "but".
pub struct LexiconSentiment {
    lexicon: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
}

impl LexiconSentiment {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
            boosters: BOOSTERS.iter().copied().collect(),
        }
    }

    fn valences(&self, tokens: &[&str], mixed_case: bool) -> Vec<f64> {
        let lowered: Vec<String> = tokens
            .iter()
            .map(|t| t.to_lowercase().replace('’', "'"))
            .collect();

        let mut valences = Vec::with_capacity(tokens.len());
        for (i, word) in lowered.iter().enumerate() {
            let Some(&base) = self.lexicon.get(word.as_str()) else {
                valences.push(0.0);
                continue;
            };

            let mut valence = base;
            if mixed_case && is_shouting(tokens[i]) {
                valence += CAPS_INCREMENT * valence.signum();
            }

            for distance in 1..=3 {
                let Some(j) = i.checked_sub(distance) else {
                    break;
                };
                let prior = lowered[j].as_str();
                if let Some(&boost) = self.boosters.get(prior) {
                    let decay = 1.0 - 0.05 * (distance as f64 - 1.0);
                    valence += boost * valence.signum() * decay;
                }
                if NEGATIONS.contains(&prior) || prior.ends_with("n't") {
                    valence *= NEGATION_SCALAR;
                }
            }

            valences.push(valence);
        }

        if let Some(pivot) = lowered.iter().position(|w| w == "but") {
            for (i, valence) in valences.iter_mut().enumerate() {
                if i < pivot {
                    *valence *= 0.5;
                } else if i > pivot {
                    *valence *= 1.5;
                }
            }
        }

        valences
    }
}

impl Default for LexiconSentiment {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for LexiconSentiment {
    fn score(&self, text: &str) -> f64 {
        let tokens: Vec<&str> = word_pattern().find_iter(text).map(|m| m.as_str()).collect();
        if tokens.is_empty() {
            return 0.0;
        }

        let mixed_case = tokens.iter().any(|t| is_shouting(t)) && !tokens.iter().all(|t| is_shouting(t));
        let mut sum: f64 = self.valences(&tokens, mixed_case).iter().sum();
        if sum == 0.0 {
            return 0.0;
        }

        let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
        sum += exclamations as f64 * EXCLAMATION_INCREMENT * sum.signum();

        let compound = sum / (sum * sum + ALPHA).sqrt();
        compound.clamp(-1.0, 1.0)
    }
}

fn is_shouting(token: &str) -> bool {
    token.chars().count() > 1
        && token.chars().any(char::is_alphabetic)
        && token.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> LexiconSentiment {
        LexiconSentiment::new()
    }

    #[test]
    fn empty_and_neutral_text_score_zero() {
        assert_eq!(scorer().score(""), 0.0);
        assert_eq!(scorer().score("   \n\t"), 0.0);
        assert_eq!(scorer().score("The meeting is on Tuesday."), 0.0);
    }

    #[test]
    fn polarity_follows_the_words() {
        assert!(scorer().score("Strong earnings beat, shares rally") > 0.0);
        assert!(scorer().score("Shares plunge after fraud probe") < 0.0);
    }

    #[test]
    fn negation_flips_polarity() {
        let s = scorer();
        assert!(s.score("results were good") > 0.0);
        assert!(s.score("results were not good") < 0.0);
        assert!(s.score("results weren't good") < 0.0);
    }

    #[test]
    fn boosters_and_emphasis_intensify() {
        let s = scorer();
        let plain = s.score("the quarter was good");
        assert!(s.score("the quarter was very good") > plain);
        assert!(s.score("the quarter was good!!") > plain);
        assert!(s.score("the quarter was GOOD") > plain);
        assert!(s.score("the quarter was slightly good") < plain);
    }

    #[test]
    fn clause_after_but_dominates() {
        assert!(scorer().score("Revenue was good but the outlook is terrible") < 0.0);
    }

    #[test]
    fn score_is_bounded() {
        let s = scorer();
        let euphoric = "GREAT excellent best love win!!!! ".repeat(200);
        let doom = "crash fraud bankrupt crisis worst ".repeat(200);
        for text in [euphoric.as_str(), doom.as_str(), "!!!!", "ñ ü 日本 😀", "n't n't but but"] {
            let value = s.score(text);
            assert!((-1.0..=1.0).contains(&value), "{} out of range for {:?}", value, text);
        }
    }

    #[test]
    fn scoring_is_deterministic() {
        let s = scorer();
        let text = "Tesla shares tumbled but analysts remain optimistic";
        assert_eq!(s.score(text), s.score(text));
    }
}

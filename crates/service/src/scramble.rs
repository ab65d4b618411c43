//! The content scrambler.
//!
//! A cosmetic text rewriter applied when content is shown to someone other
//! than its owner. It has no effect on the ledger, opinions, or
//! authorization; the platform stores a pre-scrambled copy at write time
//! (viewer unknown) and the serialization layer picks which copy to show.
//!
//! All randomness comes from the caller's RNG. Nothing here reads global
//! state, so a seeded RNG makes every algorithm reproducible in tests.

use rand::Rng;
use rand::seq::SliceRandom;
use storage::UserId;

/// The rewriting algorithm selected per user.
///
/// Selectors are persisted as plain integers; any value without a matching
/// algorithm falls back to [`ScrambleAlgorithm::Identity`] rather than
/// failing, since the stored selector is user data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrambleAlgorithm {
    /// Shuffle the interior letters of each word, keeping first and last.
    InnerShuffle,
    /// Drift e-vowels towards ä.
    VowelDrift,
    /// r/l become w, n gains a y before vowels, exclamations become faces.
    Uwu,
    /// Everything uppercase.
    AllCaps,
    /// aLtErNaTiNg case across letter pairs.
    SarcasmCase,
    /// Lowercase, punctuation stripped, first character dropped.
    OneLiner,
    /// Leave the text alone.
    Identity,
}

impl ScrambleAlgorithm {
    pub fn from_selector(selector: i64) -> Self {
        match selector {
            0 => Self::InnerShuffle,
            1 => Self::VowelDrift,
            2 => Self::Uwu,
            3 => Self::AllCaps,
            4 => Self::SarcasmCase,
            5 => Self::OneLiner,
            _ => Self::Identity,
        }
    }
}

/// Rewrite `text` for `viewer`. Owners always see their own text unchanged.
pub fn scramble<R: Rng>(
    algorithm: ScrambleAlgorithm,
    rng: &mut R,
    owner: UserId,
    viewer: Option<UserId>,
    text: &str,
) -> String {
    if viewer == Some(owner) {
        return text.to_string();
    }

    match algorithm {
        ScrambleAlgorithm::InnerShuffle => inner_shuffle(rng, text),
        ScrambleAlgorithm::VowelDrift => vowel_drift(text),
        ScrambleAlgorithm::Uwu => uwu(rng, text),
        ScrambleAlgorithm::AllCaps => text.to_uppercase(),
        ScrambleAlgorithm::SarcasmCase => sarcasm_case(text),
        ScrambleAlgorithm::OneLiner => one_liner(text),
        ScrambleAlgorithm::Identity => text.to_string(),
    }
}

fn inner_shuffle<R: Rng>(rng: &mut R, text: &str) -> String {
    text.lines()
        .map(|line| {
            line.split(' ')
                .map(|word| shuffle_word(rng, word))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn shuffle_word<R: Rng>(rng: &mut R, word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    if chars.len() < 2 {
        return word.to_string();
    }
    let mut middle = chars[1..chars.len() - 1].to_vec();
    middle.shuffle(rng);

    let mut out = String::with_capacity(word.len());
    out.push(chars[0]);
    out.extend(middle);
    out.push(chars[chars.len() - 1]);
    out
}

fn vowel_drift(text: &str) -> String {
    text.replace("är", "ä")
        .replace("Är", "Ä")
        .chars()
        .map(|c| match c {
            'e' => 'ä',
            'E' => 'Ä',
            c => c,
        })
        .collect()
}

const FACES: [&str; 6] = [" (・`ω´・) ", " ;;w;; ", " owo ", " UwU ", " >w< ", " ^w^ "];

fn uwu<R: Rng>(rng: &mut R, text: &str) -> String {
    let text = text.replace("ove", "uv");
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            'r' | 'l' => out.push('w'),
            'R' | 'L' => out.push('W'),
            'n' | 'N'
                if matches!(
                    chars.peek(),
                    Some(&('a' | 'e' | 'i' | 'o' | 'u' | 'A' | 'E' | 'I' | 'O' | 'U'))
                ) =>
            {
                out.push(c);
                out.push('y');
            }
            '!' => {
                while chars.peek() == Some(&'!') {
                    chars.next();
                }
                out.push_str(FACES[rng.gen_range(0..FACES.len())]);
            }
            c => out.push(c),
        }
    }
    out
}

fn sarcasm_case(text: &str) -> String {
    let mut upper = false;
    text.chars()
        .map(|c| {
            if !c.is_alphabetic() {
                return c;
            }
            let flipped = if upper {
                c.to_uppercase().next().unwrap_or(c)
            } else {
                c.to_lowercase().next().unwrap_or(c)
            };
            upper = !upper;
            flipped
        })
        .collect()
}

fn one_liner(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut chars = lowered.chars();
    chars.next();
    chars
        .filter(|c| !matches!(c, '.' | '!' | '?' | '\n' | '\t' | '\r'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const OWNER: UserId = UserId(1);
    const VIEWER: UserId = UserId(2);

    #[test]
    fn owners_see_their_own_text() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = scramble(
            ScrambleAlgorithm::AllCaps,
            &mut rng,
            OWNER,
            Some(OWNER),
            "leave me be",
        );
        assert_eq!(out, "leave me be");
    }

    #[test]
    fn unknown_selectors_fall_back_to_identity() {
        assert_eq!(ScrambleAlgorithm::from_selector(99), ScrambleAlgorithm::Identity);
        assert_eq!(ScrambleAlgorithm::from_selector(-1), ScrambleAlgorithm::Identity);

        let mut rng = StdRng::seed_from_u64(7);
        let out = scramble(
            ScrambleAlgorithm::Identity,
            &mut rng,
            OWNER,
            Some(VIEWER),
            "untouched",
        );
        assert_eq!(out, "untouched");
    }

    #[test]
    fn inner_shuffle_keeps_word_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = scramble(
            ScrambleAlgorithm::InnerShuffle,
            &mut rng,
            OWNER,
            Some(VIEWER),
            "scrambled words stay readable",
        );

        for (scrambled, original) in out.split(' ').zip("scrambled words stay readable".split(' ')) {
            assert_eq!(scrambled.len(), original.len());
            assert_eq!(scrambled.chars().next(), original.chars().next());
            assert_eq!(scrambled.chars().last(), original.chars().last());

            let mut a: Vec<char> = scrambled.chars().collect();
            let mut b: Vec<char> = original.chars().collect();
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn seeded_rng_makes_output_reproducible() {
        let text = "hello there, friend!";
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            scramble(ScrambleAlgorithm::Uwu, &mut rng, OWNER, Some(VIEWER), text)
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn uwu_rewrites_consonants_and_exclamations() {
        let mut rng = StdRng::seed_from_u64(3);
        let out = scramble(
            ScrambleAlgorithm::Uwu,
            &mut rng,
            OWNER,
            Some(VIEWER),
            "really nice!!",
        );
        assert!(out.starts_with("weawwy nyice"));
        assert!(FACES.iter().any(|face| out.ends_with(face)));
    }

    #[test]
    fn one_liner_flattens_text() {
        let mut rng = StdRng::seed_from_u64(3);
        let out = scramble(
            ScrambleAlgorithm::OneLiner,
            &mut rng,
            OWNER,
            Some(VIEWER),
            "Stop. Shouting!\nPlease?",
        );
        assert_eq!(out, "top shoutingplease");
    }

    #[test]
    fn vowel_drift_and_caps_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            scramble(ScrambleAlgorithm::VowelDrift, &mut rng, OWNER, None, "e E är"),
            "ä Ä ä"
        );
        assert_eq!(
            scramble(ScrambleAlgorithm::AllCaps, &mut rng, OWNER, None, "quiet"),
            "QUIET"
        );
        assert_eq!(
            scramble(ScrambleAlgorithm::SarcasmCase, &mut rng, OWNER, None, "sarcasm"),
            "sArCaSm"
        );
    }
}

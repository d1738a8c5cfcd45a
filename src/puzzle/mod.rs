//! Puzzle set canonicalization
//!
//! A puzzle set is six words laid out on a three-circle diagram. Each source
//! line names the region a word occupies, its hyphen-separated fragments and
//! its clue. Construction validates the definition and precomputes everything
//! the game needs at runtime: slot placement, fragment sort keys and the
//! symmetry-equivalent winning arrangements.

mod answer;
pub mod catalog;

pub use answer::canonicalize_answer;

use crate::types::{Fragment, SLOT_COUNT};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Errors raised while building puzzle sets. All of them are startup errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PuzzleError {
    #[error("line {line}: expected `<region> <FRAG-MENTS> <clue>`")]
    MalformedLine { line: usize },

    #[error("line {line}: unknown region label {label:?}")]
    UnknownRegion { line: usize, label: String },

    #[error("region {label:?} is used by more than one word")]
    DuplicateRegion { label: String },

    #[error("duplicate fragment {0:?}")]
    DuplicateFragment(Fragment),

    #[error("line {line}: empty fragment")]
    EmptyFragment { line: usize },

    #[error("line {line}: fragment {fragment:?} must be uppercase letters only")]
    NonCanonicalFragment { line: usize, fragment: Fragment },

    #[error("set {set}: final answer has no letters")]
    EmptyFinalAnswer { set: usize },

    #[error("expected {SLOT_COUNT} words, found {0}")]
    WrongWordCount(usize),

    #[error("catalog contains no puzzle sets")]
    EmptyCatalog,

    #[error("word line before any `== ANSWER` header (line {line})")]
    MissingHeader { line: usize },

    #[error("failed to read catalog {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Region → slot table. Base sets are numbered 1..3, intersections by their
/// two members in ascending order.
const SLOT_BY_REGION: [(&str, usize); SLOT_COUNT] = [
    ("1", 0),
    ("12", 1),
    ("2", 2),
    ("23", 3),
    ("3", 4),
    ("13", 5),
];

/// The diagram's order-6 symmetry group as slot permutations.
/// Arrangement `p` puts word `p[i]` into slot `i`.
const SYMMETRIES: [[usize; SLOT_COUNT]; SLOT_COUNT] = [
    [0, 1, 2, 3, 4, 5],
    [2, 3, 4, 5, 0, 1],
    [4, 5, 0, 1, 2, 3],
    [0, 5, 4, 3, 2, 1],
    [4, 3, 2, 1, 0, 5],
    [2, 1, 0, 5, 4, 3],
];

/// Spacing between per-word priorities in the sort key
const SORT_KEY_STRIDE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Word {
    pub answer: String,
    pub fragments: Vec<Fragment>,
    pub clue: String,
}

#[derive(Debug, Clone)]
pub struct PuzzleSet {
    /// Index into the catalog (0-based)
    pub index: usize,
    pub final_answer: String,
    /// Words by slot index
    words: Vec<Word>,
    /// Slot indices in clue presentation order
    clue_order: Vec<usize>,
    all_fragments: Vec<Fragment>,
    sort_keys: HashMap<Fragment, u32>,
    valid_arrangements: Vec<String>,
}

struct ParsedLine {
    line: usize,
    label: String,
    fragments: Vec<Fragment>,
    clue: String,
}

impl PuzzleSet {
    /// Parse a six-line definition block.
    ///
    /// The random source only decides how word groups are ordered relative to
    /// each other in the sort key; fragments within a word keep their order.
    pub fn parse<R: Rng + ?Sized>(
        index: usize,
        final_answer: &str,
        text: &str,
        rng: &mut R,
    ) -> Result<Self, PuzzleError> {
        let final_answer = canonicalize_answer(final_answer);
        if final_answer.is_empty() {
            return Err(PuzzleError::EmptyFinalAnswer { set: index + 1 });
        }

        let mut parsed = Vec::new();
        for (n, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            parsed.push(parse_line(n + 1, line)?);
        }
        if parsed.len() != SLOT_COUNT {
            return Err(PuzzleError::WrongWordCount(parsed.len()));
        }

        let regions = resolve_regions(&parsed)?;

        let mut priorities: Vec<u32> = (0..SLOT_COUNT as u32).collect();
        priorities.shuffle(rng);

        let mut words: Vec<Option<Word>> = vec![None; SLOT_COUNT];
        let mut sort_keys = HashMap::new();
        let mut all_fragments = Vec::new();

        for (entry, slot) in parsed.into_iter().zip(regions) {
            let priority = priorities[slot];
            for (position, fragment) in entry.fragments.iter().enumerate() {
                let key = priority * SORT_KEY_STRIDE + position as u32;
                if sort_keys.insert(fragment.clone(), key).is_some() {
                    return Err(PuzzleError::DuplicateFragment(fragment.clone()));
                }
            }
            words[slot] = Some(Word {
                answer: entry.fragments.concat(),
                fragments: entry.fragments,
                clue: entry.clue,
            });
        }

        // Six distinct regions map onto six distinct slots, so every slot is filled.
        let words: Vec<Word> = words.into_iter().flatten().collect();
        for word in &words {
            all_fragments.extend(word.fragments.iter().cloned());
        }

        let mut clue_order: Vec<usize> = (0..SLOT_COUNT).collect();
        clue_order.sort_by(|a, b| words[*a].clue.cmp(&words[*b].clue));

        let valid_arrangements = SYMMETRIES
            .iter()
            .map(|perm| {
                perm.iter()
                    .map(|&w| words[w].answer.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();

        Ok(Self {
            index,
            final_answer,
            words,
            clue_order,
            all_fragments,
            sort_keys,
            valid_arrangements,
        })
    }

    /// Word placed at `slot`
    pub fn word(&self, slot: usize) -> &Word {
        &self.words[slot]
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Words in the order their clues are presented
    pub fn clue_order(&self) -> impl Iterator<Item = &Word> + '_ {
        self.clue_order.iter().map(|&slot| &self.words[slot])
    }

    /// The `i`th word in clue order
    pub fn clue_word(&self, i: usize) -> Option<&Word> {
        self.clue_order.get(i).map(|&slot| &self.words[slot])
    }

    pub fn all_fragments(&self) -> &[Fragment] {
        &self.all_fragments
    }

    pub fn sort_key(&self, fragment: &str) -> Option<u32> {
        self.sort_keys.get(fragment).copied()
    }

    pub fn valid_arrangements(&self) -> &[String] {
        &self.valid_arrangements
    }
}

fn parse_line(line: usize, text: &str) -> Result<ParsedLine, PuzzleError> {
    let (label, rest) = next_token(text);
    let (chunks, clue) = next_token(rest);
    let clue = clue.trim();
    if label.is_empty() || chunks.is_empty() || clue.is_empty() {
        return Err(PuzzleError::MalformedLine { line });
    }

    let fragments: Vec<Fragment> = chunks.split('-').map(str::to_string).collect();
    if fragments.iter().any(String::is_empty) {
        return Err(PuzzleError::EmptyFragment { line });
    }
    // Fragments must survive canonicalization unchanged
    if let Some(fragment) = fragments.iter().find(|f| canonicalize_answer(f) != **f) {
        return Err(PuzzleError::NonCanonicalFragment {
            line,
            fragment: fragment.clone(),
        });
    }

    Ok(ParsedLine {
        line,
        label: label.to_string(),
        fragments,
        clue: clue.to_string(),
    })
}

/// Split off the first whitespace-delimited token
fn next_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], &text[end..]),
        None => (text, ""),
    }
}

/// Map free-form region labels onto slot indices.
///
/// Single-character labels are the base sets, numbered 1..3 by first
/// appearance. Two-character labels are intersections of two base sets.
fn resolve_regions(lines: &[ParsedLine]) -> Result<Vec<usize>, PuzzleError> {
    let mut base: HashMap<char, char> = HashMap::new();
    for entry in lines {
        let mut chars = entry.label.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if base.contains_key(&c) {
                return Err(PuzzleError::DuplicateRegion {
                    label: entry.label.clone(),
                });
            }
            let number = char::from(b'1' + base.len() as u8);
            base.insert(c, number);
        }
    }

    let mut seen = HashSet::new();
    let mut slots = Vec::with_capacity(lines.len());
    for entry in lines {
        let unknown = || PuzzleError::UnknownRegion {
            line: entry.line,
            label: entry.label.clone(),
        };
        let mut numbers = entry
            .label
            .chars()
            .map(|c| base.get(&c).copied().ok_or_else(unknown))
            .collect::<Result<Vec<_>, _>>()?;
        numbers.sort_unstable();
        let key: String = numbers.into_iter().collect();
        let slot = SLOT_BY_REGION
            .iter()
            .find(|(region, _)| *region == key)
            .map(|(_, slot)| *slot)
            .ok_or_else(unknown)?;
        if !seen.insert(slot) {
            return Err(PuzzleError::DuplicateRegion {
                label: entry.label.clone(),
            });
        }
        slots.push(slot);
    }
    Ok(slots)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    pub(crate) const WOOD: &str = "
        M  PL-AS-TIC\tThe \"Great Pacific Garbage Patch\" is mostly composed of micro-particles of this.
        G  WED-GE\tA doorstop is an example of this, one of the six simple machines.
        A  GAR-LA-ND\tThis one-time Supreme Court nominee shares his last name with a decorative wreath.
        AG DR-IV-ER\tA chauffeur, or a program that lets hardware talk to an operating system.
        MG IR-ON\tThis element is also the name of a household appliance.
        MA STO-NE\t14 pounds equals one of these, if you're a Brit.
    ";

    pub(crate) fn wood_set(seed: u64) -> PuzzleSet {
        let mut rng = StdRng::seed_from_u64(seed);
        PuzzleSet::parse(0, "wood", WOOD, &mut rng).unwrap()
    }

    #[test]
    fn test_parse_places_words_by_region() {
        let set = wood_set(1);
        let answers: Vec<&str> = set.words().iter().map(|w| w.answer.as_str()).collect();
        assert_eq!(
            answers,
            vec!["PLASTIC", "IRON", "WEDGE", "DRIVER", "GARLAND", "STONE"]
        );
        assert_eq!(set.final_answer, "WOOD");
        for word in set.words() {
            assert_eq!(word.fragments.concat(), word.answer);
        }
    }

    #[test]
    fn test_sort_keys_cover_every_fragment_once() {
        let set = wood_set(7);
        assert_eq!(set.all_fragments().len(), 15);

        let keys: HashSet<u32> = set
            .all_fragments()
            .iter()
            .map(|f| set.sort_key(f).unwrap())
            .collect();
        assert_eq!(keys.len(), set.all_fragments().len());

        for word in set.words() {
            let ks: Vec<u32> = word
                .fragments
                .iter()
                .map(|f| set.sort_key(f).unwrap())
                .collect();
            assert!(ks.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_sort_keys_stable_for_same_seed() {
        let a = wood_set(42);
        let b = wood_set(42);
        for f in a.all_fragments() {
            assert_eq!(a.sort_key(f), b.sort_key(f));
        }
    }

    #[test]
    fn test_valid_arrangements_are_symmetry_orbit() {
        let set = wood_set(3);
        let arrangements = set.valid_arrangements();
        assert_eq!(arrangements.len(), 6);
        assert_eq!(arrangements[0], "PLASTIC,IRON,WEDGE,DRIVER,GARLAND,STONE");
        assert_eq!(arrangements[1], "WEDGE,DRIVER,GARLAND,STONE,PLASTIC,IRON");
        assert_eq!(arrangements[3], "PLASTIC,STONE,GARLAND,DRIVER,WEDGE,IRON");
        let unique: HashSet<&String> = arrangements.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_clue_order_sorted_by_clue_text() {
        let set = wood_set(3);
        let clues: Vec<&str> = set.clue_order().map(|w| w.clue.as_str()).collect();
        let mut sorted = clues.clone();
        sorted.sort();
        assert_eq!(clues, sorted);
        assert_eq!(set.clue_word(0).unwrap().answer, "STONE");
        assert!(set.clue_word(6).is_none());
    }

    #[test]
    fn test_intersection_label_before_base_labels() {
        let text = "
            AG DR-IV-ER clue d
            M  PL-AS-TIC clue a
            G  WED-GE clue b
            A  GAR-LA-ND clue c
            MG IR-ON clue e
            MA STO-NE clue f
        ";
        let mut rng = StdRng::seed_from_u64(0);
        let set = PuzzleSet::parse(0, "WOOD", text, &mut rng).unwrap();
        assert_eq!(set.word(3).answer, "DRIVER");
        assert_eq!(set.word(0).answer, "PLASTIC");
    }

    #[test]
    fn test_duplicate_fragment_fails() {
        let text = WOOD.replace("STO-NE", "STO-GE");
        let mut rng = StdRng::seed_from_u64(0);
        let err = PuzzleSet::parse(0, "WOOD", &text, &mut rng).unwrap_err();
        assert_eq!(err, PuzzleError::DuplicateFragment("GE".to_string()));
    }

    #[test]
    fn test_wrong_word_count_fails() {
        let text: String = WOOD.lines().take(4).collect::<Vec<_>>().join("\n");
        let mut rng = StdRng::seed_from_u64(0);
        let err = PuzzleSet::parse(0, "WOOD", &text, &mut rng).unwrap_err();
        assert_eq!(err, PuzzleError::WrongWordCount(3));
    }

    #[test]
    fn test_malformed_and_unknown_regions_fail() {
        let mut rng = StdRng::seed_from_u64(0);

        let text = WOOD.replace("MA STO-NE", "MX STO-NE");
        assert!(matches!(
            PuzzleSet::parse(0, "WOOD", &text, &mut rng),
            Err(PuzzleError::UnknownRegion { .. })
        ));

        let text = WOOD.replace("MA STO-NE", "MG STO-NE");
        assert!(matches!(
            PuzzleSet::parse(0, "WOOD", &text, &mut rng),
            Err(PuzzleError::DuplicateRegion { .. })
        ));

        let text = WOOD.replace("STO-NE", "STO--NE");
        assert!(matches!(
            PuzzleSet::parse(0, "WOOD", &text, &mut rng),
            Err(PuzzleError::EmptyFragment { .. })
        ));

        let text = WOOD.replace("STO-NE\t14 pounds equals one of these, if you're a Brit.", "STO-NE");
        assert!(matches!(
            PuzzleSet::parse(0, "WOOD", &text, &mut rng),
            Err(PuzzleError::MalformedLine { .. })
        ));
    }

    #[test]
    fn test_fragments_must_be_canonical() {
        let mut rng = StdRng::seed_from_u64(0);

        let text = WOOD.replace("PL-AS-TIC", "pl-as-tic");
        assert_eq!(
            PuzzleSet::parse(0, "WOOD", &text, &mut rng).unwrap_err(),
            PuzzleError::NonCanonicalFragment {
                line: 2,
                fragment: "pl".to_string(),
            }
        );

        let text = WOOD.replace("IR-ON", "O'HA-RE");
        assert!(matches!(
            PuzzleSet::parse(0, "WOOD", &text, &mut rng),
            Err(PuzzleError::NonCanonicalFragment { fragment, .. }) if fragment == "O'HA"
        ));
    }

    #[test]
    fn test_final_answer_needs_letters() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            PuzzleSet::parse(2, "42", WOOD, &mut rng).unwrap_err(),
            PuzzleError::EmptyFinalAnswer { set: 3 }
        );
    }
}

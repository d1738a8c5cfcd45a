//! Catalog of puzzle sets
//!
//! A catalog is a sequence of blocks. `== ANSWER` opens a block whose word
//! lines follow until the next header. `#` starts a comment line.

use super::{PuzzleError, PuzzleSet};
use rand::Rng;
use std::path::Path;

/// Catalog compiled into the binary
pub const BUILTIN: &str = include_str!("../../puzzles/hat_shop.txt");

/// Parse every block of a catalog into puzzle sets, in order.
pub fn parse_catalog<R: Rng + ?Sized>(
    text: &str,
    rng: &mut R,
) -> Result<Vec<PuzzleSet>, PuzzleError> {
    let mut blocks: Vec<(String, String)> = Vec::new();

    for (n, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(answer) = line.strip_prefix("==") {
            blocks.push((answer.trim().to_string(), String::new()));
            continue;
        }
        let Some((_, body)) = blocks.last_mut() else {
            return Err(PuzzleError::MissingHeader { line: n + 1 });
        };
        body.push_str(line);
        body.push('\n');
    }

    if blocks.is_empty() {
        return Err(PuzzleError::EmptyCatalog);
    }

    blocks
        .iter()
        .enumerate()
        .map(|(index, (answer, body))| PuzzleSet::parse(index, answer, body, rng))
        .collect()
}

/// Load the catalog from `path`, or the built-in one when no path is given.
pub fn load<R: Rng + ?Sized>(
    path: Option<&Path>,
    rng: &mut R,
) -> Result<Vec<PuzzleSet>, PuzzleError> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| PuzzleError::Unreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            tracing::info!("Loading puzzle catalog from {}", path.display());
            parse_catalog(&text, rng)
        }
        None => parse_catalog(BUILTIN, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    #[test]
    fn test_builtin_catalog_parses() {
        let mut rng = StdRng::seed_from_u64(0);
        let sets = parse_catalog(BUILTIN, &mut rng).unwrap();
        let finals: Vec<&str> = sets.iter().map(|s| s.final_answer.as_str()).collect();
        assert_eq!(
            finals,
            vec!["WOOD", "MERCURY", "MADISON", "DUCK", "HERTZ", "JORDAN"]
        );
        for (i, set) in sets.iter().enumerate() {
            assert_eq!(set.index, i);
            assert_eq!(set.words().len(), 6);
        }
    }

    #[test]
    fn test_word_line_before_header_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = parse_catalog("M PL-AS-TIC clue\n== WOOD\n", &mut rng).unwrap_err();
        assert_eq!(err, PuzzleError::MissingHeader { line: 1 });
    }

    #[test]
    fn test_empty_catalog_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = parse_catalog("# nothing here\n\n", &mut rng).unwrap_err();
        assert_eq!(err, PuzzleError::EmptyCatalog);
    }

    #[test]
    fn test_block_errors_propagate() {
        let mut rng = StdRng::seed_from_u64(0);
        let text = "== WOOD\nM PL-AS-TIC clue\nG WED-GE clue\n";
        let err = parse_catalog(text, &mut rng).unwrap_err();
        assert_eq!(err, PuzzleError::WrongWordCount(2));
    }

    #[test]
    fn test_header_without_letters_fails() {
        let words = "M PL-AS-TIC a\nG WED-GE b\nA GAR-LA-ND c\nAG DR-IV-ER d\nMG IR-ON e\nMA STO-NE f\n";
        let mut rng = StdRng::seed_from_u64(0);

        let err = parse_catalog(&format!("==\n{}", words), &mut rng).unwrap_err();
        assert_eq!(err, PuzzleError::EmptyFinalAnswer { set: 1 });

        let text = format!("== WOOD\n{}== 42\n{}", words, words);
        let err = parse_catalog(&text, &mut rng).unwrap_err();
        assert_eq!(err, PuzzleError::EmptyFinalAnswer { set: 2 });
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "== WOOD\n\
             M  PL-AS-TIC a\n\
             G  WED-GE b\n\
             A  GAR-LA-ND c\n\
             AG DR-IV-ER d\n\
             MG IR-ON e\n\
             MA STO-NE f"
        )
        .unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        let sets = load(Some(file.path()), &mut rng).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].word(0).answer, "PLASTIC");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            load(Some(&missing), &mut rng),
            Err(PuzzleError::Unreadable { .. })
        ));
    }
}

//! Address standardization and fuzzy matching
//!
//! Standardization is a pure, deterministic function; the similarity
//! score drives both property-record fuzzy matching and geocode
//! cross-validation.

use regex::Regex;
use std::sync::OnceLock;

fn unit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+(apt|apartment|unit|#)\s*[\w-]+").expect("valid regex"))
}

fn borough_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i),?\s*(manhattan|brooklyn|bronx|queens|staten island)\s*,?")
            .expect("valid regex")
    })
}

fn directional_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(northeast|northwest|southeast|southwest|north|south|east|west)\b")
            .expect("valid regex")
    })
}

fn street_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(street|avenue|boulevard|place|road|drive|lane|court|plaza|parkway)\b")
            .expect("valid regex")
    })
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn abbreviate_directional(word: &str) -> &'static str {
    match word.to_ascii_lowercase().as_str() {
        "north" => "n",
        "south" => "s",
        "east" => "e",
        "west" => "w",
        "northeast" => "ne",
        "northwest" => "nw",
        "southeast" => "se",
        "southwest" => "sw",
        _ => "",
    }
}

fn abbreviate_street_type(word: &str) -> &'static str {
    match word.to_ascii_lowercase().as_str() {
        "street" => "st",
        "avenue" => "ave",
        "boulevard" => "blvd",
        "place" => "pl",
        "road" => "rd",
        "drive" => "dr",
        "lane" => "ln",
        "court" => "ct",
        "plaza" => "plz",
        "parkway" => "pkwy",
        _ => "",
    }
}

/// Standardize an address for matching: strip unit tokens and borough
/// names, abbreviate directionals and street types, collapse whitespace,
/// uppercase. Idempotent.
pub fn standardize(address: &str) -> String {
    let address = unit_re().replace_all(address, "");
    let address = borough_re().replace_all(&address, "");
    let address = directional_re().replace_all(&address, |caps: &regex::Captures<'_>| {
        abbreviate_directional(&caps[1]).to_string()
    });
    let address = street_type_re().replace_all(&address, |caps: &regex::Captures<'_>| {
        abbreviate_street_type(&caps[1]).to_string()
    });
    let address = whitespace_re().replace_all(address.trim(), " ");

    address.to_uppercase()
}

/// Leading street-number token of a standardized address, if present.
pub fn leading_street_number(address: &str) -> Option<&str> {
    let end = address
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(address.len());
    if end == 0 {
        None
    } else {
        Some(&address[..end])
    }
}

/// Parsed components of a free-text address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressComponents {
    pub street_number: Option<String>,
    pub street_name: Option<String>,
}

/// Split an address into a leading street number and the street name up
/// to the first comma.
pub fn parse_components(address: &str) -> AddressComponents {
    let trimmed = address.trim();
    let street_number = leading_street_number(trimmed).map(str::to_string);

    let street_name = street_number.as_ref().and_then(|number| {
        let rest = trimmed[number.len()..].trim_start();
        let name = rest.split(',').next().unwrap_or("").trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    });

    AddressComponents {
        street_number,
        street_name,
    }
}

/// Longest common subsequence length over characters.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

/// Similarity of two addresses in [0, 1]: a character-sequence ratio over
/// the standardized forms plus a 0.10 bonus when the leading street
/// numbers match exactly, capped at 1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let std_a = standardize(a);
    let std_b = standardize(b);

    if std_a.is_empty() && std_b.is_empty() {
        return 1.0;
    }
    if std_a.is_empty() || std_b.is_empty() {
        return 0.0;
    }

    let chars_a: Vec<char> = std_a.chars().collect();
    let chars_b: Vec<char> = std_b.chars().collect();
    let mut score =
        2.0 * lcs_len(&chars_a, &chars_b) as f64 / (chars_a.len() + chars_b.len()) as f64;

    if let (Some(num_a), Some(num_b)) = (
        leading_street_number(&std_a),
        leading_street_number(&std_b),
    ) {
        if num_a == num_b {
            score += 0.10;
        }
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardize_examples() {
        assert_eq!(
            standardize("350 Central Park West, Manhattan"),
            "350 CENTRAL PARK W"
        );
        assert_eq!(standardize("123 East 74th Street"), "123 E 74TH ST");
        assert_eq!(
            standardize("456 Broadway Apt 5B, New York"),
            "456 BROADWAY, NEW YORK"
        );
    }

    #[test]
    fn test_standardize_idempotent() {
        let inputs = [
            "350 Central Park West, Manhattan, NY",
            "123 East 74th Street Apt 2A, New York, NY",
            "1 Wall Street",
            "  9   Avenue of the Americas  ",
        ];
        for input in inputs {
            let once = standardize(input);
            assert_eq!(standardize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_similarity_identity() {
        let addr = "350 Central Park West, New York";
        assert!((similarity(addr, addr) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_range() {
        let pairs = [
            ("350 Central Park West", "350 CPW"),
            ("", ""),
            ("", "123 Main St"),
            ("1 Wall Street", "200 Flatbush Avenue"),
        ];
        for (a, b) in pairs {
            let s = similarity(a, b);
            assert!((0.0..=1.0).contains(&s), "similarity({a:?}, {b:?}) = {s}");
        }
    }

    #[test]
    fn test_similarity_street_number_bonus() {
        let with_bonus = similarity("350 Central Park West", "350 Central Park W");
        let without = similarity("350 Central Park West", "351 Central Park W");
        assert!(with_bonus > without);
        assert!((with_bonus - 1.0).abs() < 1e-9); // identical after standardization
    }

    #[test]
    fn test_parse_components() {
        let parsed = parse_components("350 Central Park West, New York, NY");
        assert_eq!(parsed.street_number.as_deref(), Some("350"));
        assert_eq!(parsed.street_name.as_deref(), Some("Central Park West"));

        let no_number = parse_components("Central Park West");
        assert_eq!(no_number.street_number, None);
        assert_eq!(no_number.street_name, None);
    }

    #[test]
    fn test_leading_street_number() {
        assert_eq!(leading_street_number("350 CENTRAL PARK W"), Some("350"));
        assert_eq!(leading_street_number("NO NUMBER HERE"), None);
        assert_eq!(leading_street_number(""), None);
    }
}

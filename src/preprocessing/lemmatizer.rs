//! Rule-based noun lemmatization
//!
//! Reduces plural nouns to their singular base form using a small table of
//! irregular plurals followed by suffix detachment rules. Every lemma the
//! rules produce is itself left unchanged by the rules.

use hashbrown::HashMap;

/// Minimum length a lemma must keep for a suffix rule to apply
const MIN_LEMMA_LENGTH: usize = 3;

/// Suffix rules, tried in order: (suffix, replacement)
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("ies", "y"),
    ("sses", "ss"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
];

/// Endings that look plural but are not
const PROTECTED_ENDINGS: &[&str] = &["ss", "us", "is"];

/// Noun lemmatizer
#[derive(Debug, Clone)]
pub struct Lemmatizer {
    irregular: HashMap<&'static str, &'static str>,
}

impl Lemmatizer {
    pub fn new() -> Self {
        let irregular = [
            ("men", "man"),
            ("women", "woman"),
            ("children", "child"),
            ("feet", "foot"),
            ("teeth", "tooth"),
            ("geese", "goose"),
            ("mice", "mouse"),
            ("lice", "louse"),
            ("oxen", "ox"),
            ("people", "person"),
            ("data", "datum"),
            ("criteria", "criterion"),
            ("phenomena", "phenomenon"),
            ("indices", "index"),
            ("matrices", "matrix"),
            ("vertices", "vertex"),
            ("analyses", "analysis"),
            ("theses", "thesis"),
            ("crises", "crisis"),
            ("axes", "axis"),
            ("leaves", "leaf"),
            ("knives", "knife"),
            ("wives", "wife"),
            ("lives", "life"),
            ("wolves", "wolf"),
            ("halves", "half"),
            ("selves", "self"),
            ("series", "series"),
            ("species", "species"),
            ("news", "news"),
        ]
        .into_iter()
        .collect();

        Self { irregular }
    }

    /// Lemmatize a single lowercase token
    pub fn lemmatize(&self, token: &str) -> String {
        if let Some(lemma) = self.irregular.get(token) {
            return (*lemma).to_string();
        }

        for (suffix, replacement) in SUFFIX_RULES {
            if let Some(stem) = token.strip_suffix(suffix) {
                let lemma = format!("{}{}", stem, replacement);
                if lemma.chars().count() >= MIN_LEMMA_LENGTH {
                    return lemma;
                }
            }
        }

        if PROTECTED_ENDINGS.iter().any(|ending| token.ends_with(ending)) {
            return token.to_string();
        }

        if let Some(stem) = token.strip_suffix('s') {
            if let Some(lemma) = self.irregular.get(stem) {
                return (*lemma).to_string();
            }
            if stem.chars().count() >= MIN_LEMMA_LENGTH {
                return stem.to_string();
            }
        }

        token.to_string()
    }
}

impl Default for Lemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_plurals() {
        let lemmatizer = Lemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("cats"), "cat");
        assert_eq!(lemmatizer.lemmatize("studies"), "study");
        assert_eq!(lemmatizer.lemmatize("classes"), "class");
        assert_eq!(lemmatizer.lemmatize("boxes"), "box");
        assert_eq!(lemmatizer.lemmatize("churches"), "church");
        assert_eq!(lemmatizer.lemmatize("dishes"), "dish");
    }

    #[test]
    fn test_protected_words() {
        let lemmatizer = Lemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("glass"), "glass");
        assert_eq!(lemmatizer.lemmatize("virus"), "virus");
        assert_eq!(lemmatizer.lemmatize("thesis"), "thesis");
        assert_eq!(lemmatizer.lemmatize("gas"), "gas");
    }

    #[test]
    fn test_irregular_plurals() {
        let lemmatizer = Lemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("children"), "child");
        assert_eq!(lemmatizer.lemmatize("mice"), "mouse");
        assert_eq!(lemmatizer.lemmatize("matrices"), "matrix");
    }

    #[test]
    fn test_lemmas_are_fixed_points() {
        let lemmatizer = Lemmatizer::new();
        for word in [
            "cats", "studies", "classes", "boxes", "buses", "children", "axes", "ties", "graphics",
            "games", "analyses", "glasses", "matrices", "planets", "series", "mens",
        ] {
            let once = lemmatizer.lemmatize(word);
            let twice = lemmatizer.lemmatize(&once);
            assert_eq!(once, twice, "lemma of {} is not stable", word);
        }
    }
}

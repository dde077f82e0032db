//! Labelled document collections
//!
//! A corpus can be loaded from:
//! - a directory tree with one sub-directory per category
//!   (the "20news-bydate" layout)
//! - a JSON dataset file
//! - the built-in sample collection

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while assembling a corpus
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Corpus path does not exist: {0}")]
    MissingPath(PathBuf),

    #[error("No categories found under {0}")]
    NoCategories(PathBuf),

    #[error("Document {index} has label {label}, but only {n_labels} label names are defined")]
    LabelOutOfRange {
        index: usize,
        label: usize,
        n_labels: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A raw document with its ground-truth category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Raw text as loaded
    pub text: String,
    /// Category label, an index into the corpus label names
    pub label: usize,
}

impl Document {
    pub fn new(text: impl Into<String>, label: usize) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Options for loading a corpus from a directory tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryOptions {
    /// Only load these categories (all when `None`)
    pub categories: Option<Vec<String>>,
    /// Drop the mail header block (everything before the first blank line)
    pub strip_headers: bool,
    /// Drop quoted reply lines (starting with `>` or `|`)
    pub strip_quotes: bool,
    /// Drop the signature block after a trailing `--` line
    pub strip_footer: bool,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            categories: None,
            strip_headers: true,
            strip_quotes: true,
            strip_footer: true,
        }
    }
}

/// On-disk JSON layout accepted by [`Corpus::from_json`]
#[derive(Debug, Serialize, Deserialize)]
struct CorpusFile {
    label_names: Vec<String>,
    documents: Vec<Document>,
}

/// Ordered, labelled document collection
#[derive(Debug, Clone)]
pub struct Corpus {
    documents: Vec<Document>,
    label_names: Vec<String>,
}

impl Corpus {
    /// Build a corpus, checking that every label refers to a known name
    pub fn new(documents: Vec<Document>, label_names: Vec<String>) -> Result<Self, CorpusError> {
        let n_labels = label_names.len();
        if let Some((index, doc)) = documents
            .iter()
            .enumerate()
            .find(|(_, doc)| doc.label >= n_labels)
        {
            return Err(CorpusError::LabelOutOfRange {
                index,
                label: doc.label,
                n_labels,
            });
        }

        Ok(Self {
            documents,
            label_names,
        })
    }

    /// Load one document per file from `root/<category>/<file>`
    ///
    /// Label ids follow the alphabetical order of the category names.
    pub fn from_directory<P: AsRef<Path>>(
        root: P,
        options: &DirectoryOptions,
    ) -> Result<Self, CorpusError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(CorpusError::MissingPath(root.to_path_buf()));
        }

        let mut categories: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let wanted = options
                .categories
                .as_ref()
                .map_or(true, |allowed| allowed.iter().any(|c| c == &name));
            if wanted {
                categories.push((name, entry.path()));
            }
        }

        if categories.is_empty() {
            return Err(CorpusError::NoCategories(root.to_path_buf()));
        }
        categories.sort_by(|a, b| a.0.cmp(&b.0));

        let mut documents = Vec::new();
        let mut label_names = Vec::with_capacity(categories.len());

        for (label, (name, dir)) in categories.into_iter().enumerate() {
            let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            files.sort();

            for file in files {
                let bytes = fs::read(&file)?;
                let raw = String::from_utf8_lossy(&bytes);
                documents.push(Document::new(strip_post(&raw, options), label));
            }
            label_names.push(name);
        }

        log::info!(
            "Loaded {} documents in {} categories from {:?}",
            documents.len(),
            label_names.len(),
            root
        );

        Self::new(documents, label_names)
    }

    /// Load a JSON dataset: `{ "label_names": [...], "documents": [{"text", "label"}] }`
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CorpusError::MissingPath(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let file: CorpusFile = serde_json::from_str(&content)?;
        Self::new(file.documents, file.label_names)
    }

    /// Write the corpus in the layout read by [`Corpus::from_json`]
    pub fn to_json(&self) -> Result<String, CorpusError> {
        let file = CorpusFile {
            label_names: self.label_names.clone(),
            documents: self.documents.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Small built-in collection with four clearly separated categories
    pub fn sample() -> Self {
        let groups: [(&str, &[&str]); 4] = [
            (
                "rec.sport.hockey",
                &[
                    "The goalie made forty saves as the team won the playoff game in overtime.",
                    "Our defensemen blocked shots all night and the power play scored twice.",
                    "The coach benched two forwards after the team lost three games on the road.",
                    "Hockey fans cheered when the captain scored a hat trick against the rivals.",
                    "The playoff series went to seven games and the goalie stopped every penalty shot.",
                    "Skaters need sharp blades; the forwards practised power play drills on the ice.",
                    "The league suspended the defenseman for a hit that injured the opposing captain.",
                    "Season tickets for the hockey team sold out before the first playoff game.",
                ],
            ),
            (
                "sci.space",
                &[
                    "The probe entered orbit around the planet after a seven month journey.",
                    "Engineers tested the rocket engine before the launch of the lunar lander.",
                    "The space station crew repaired a solar panel during a long spacewalk outside.",
                    "Astronomers tracked the orbit of the comet using data from the space telescope.",
                    "The launch was delayed because of high winds near the rocket pad.",
                    "A new telescope will measure the atmosphere of planets orbiting distant stars.",
                    "The lander touched down on the lunar surface and sent images back to mission control.",
                    "Satellite operators moved the spacecraft to a higher orbit to avoid debris.",
                ],
            ),
            (
                "comp.graphics",
                &[
                    "The renderer uses ray tracing to compute shadows and reflections for each pixel.",
                    "Convert the image to a different file format before loading it into the viewer.",
                    "Texture mapping and shading are handled by the graphics card driver.",
                    "The software draws polygons and applies an antialiasing filter to the image.",
                    "I need a program that converts bitmap images to vector graphics files.",
                    "The graphics library supports three dimensional rendering of polygons and textures.",
                    "Color palettes and pixel formats differ between image file formats.",
                    "Ray tracing software renders reflections slowly without a fast graphics card.",
                ],
            ),
            (
                "talk.politics.guns",
                &[
                    "The senate debated a bill that would restrict firearm sales at gun shows.",
                    "Gun owners argued that the amendment protects their right to carry a firearm.",
                    "The police department reported fewer firearm crimes after the new law passed.",
                    "Congress will vote on background checks for gun purchases next week.",
                    "The court ruled that the state firearm law violated the constitutional amendment.",
                    "Lawmakers proposed a ban on certain rifles while gun owners protested.",
                    "Crime statistics were cited by both sides of the gun control debate in congress.",
                    "The sheriff said the law requires a permit to carry a concealed firearm.",
                ],
            ),
        ];

        let mut documents = Vec::new();
        let mut label_names = Vec::new();
        for (label, (name, texts)) in groups.iter().enumerate() {
            label_names.push(name.to_string());
            documents.extend(texts.iter().map(|text| Document::new(*text, label)));
        }

        Self {
            documents,
            label_names,
        }
    }

    /// Return a copy with documents shuffled deterministically by `seed`
    pub fn shuffled(&self, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut documents = self.documents.clone();
        documents.shuffle(&mut rng);

        Self {
            documents,
            label_names: self.label_names.clone(),
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Raw texts in document order
    pub fn texts(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.text.as_str()).collect()
    }

    /// Ground-truth labels in document order
    pub fn labels(&self) -> Vec<usize> {
        self.documents.iter().map(|d| d.label).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn n_labels(&self) -> usize {
        self.label_names.len()
    }
}

/// Remove header, quoted lines and signature from a newsgroup post
fn strip_post(raw: &str, options: &DirectoryOptions) -> String {
    let mut lines: Vec<&str> = raw.lines().collect();

    // `lines` also drops the `\r` of CRLF files, so the blank separator is found either way
    if options.strip_headers {
        if let Some(pos) = lines.iter().position(|line| line.trim().is_empty()) {
            lines.drain(..=pos);
        }
    }

    if options.strip_footer {
        if let Some(pos) = lines.iter().rposition(|line| line.trim() == "--") {
            lines.truncate(pos);
        }
    }

    if options.strip_quotes {
        lines.retain(|line| {
            let trimmed = line.trim_start();
            !(trimmed.starts_with('>') || trimmed.starts_with('|'))
        });
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sample_corpus() {
        let corpus = Corpus::sample();
        assert_eq!(corpus.n_labels(), 4);
        assert_eq!(corpus.len(), 32);
        assert!(corpus.labels().iter().all(|&l| l < 4));
    }

    #[test]
    fn test_label_out_of_range() {
        let docs = vec![Document::new("text", 0), Document::new("more", 2)];
        let result = Corpus::new(docs, vec!["a".into(), "b".into()]);
        assert!(matches!(
            result,
            Err(CorpusError::LabelOutOfRange { index: 1, label: 2, .. })
        ));
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        let corpus = Corpus::sample();
        let a = corpus.shuffled(42);
        let b = corpus.shuffled(42);
        assert_eq!(a.documents(), b.documents());
        assert_ne!(a.documents(), corpus.documents());

        let mut original = corpus.texts();
        let mut shuffled = a.texts();
        original.sort();
        shuffled.sort();
        assert_eq!(original, shuffled);
    }

    #[test]
    fn test_strip_post() {
        let raw = "From: someone@example.com\nSubject: test\n\nHello there\n> quoted reply\nBody line\n--\nMy signature";
        let body = strip_post(raw, &DirectoryOptions::default());
        assert_eq!(body, "Hello there\nBody line");
    }

    #[test]
    fn test_strip_post_crlf() {
        let raw = "From: a@example.com\r\nSubject: b\r\n\r\nbody text\r\n> quoted\r\nmore\r\n";
        let body = strip_post(raw, &DirectoryOptions::default());
        assert_eq!(body, "body text\nmore");
    }

    #[test]
    fn test_strip_post_without_blank_line_keeps_text() {
        let body = strip_post("only one line", &DirectoryOptions::default());
        assert_eq!(body, "only one line");
    }

    #[test]
    fn test_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        for (category, files) in [("sci.space", 2), ("alt.atheism", 1)] {
            let path = dir.path().join(category);
            fs::create_dir(&path).unwrap();
            for i in 0..files {
                fs::write(path.join(format!("{}", i)), format!("Header: x\n\nbody {}", i)).unwrap();
            }
        }

        let corpus = Corpus::from_directory(dir.path(), &DirectoryOptions::default()).unwrap();
        assert_eq!(corpus.label_names(), &["alt.atheism", "sci.space"]);
        assert_eq!(corpus.labels(), vec![0, 1, 1]);
        assert_eq!(corpus.documents()[1].text, "body 0");

        let only_space = DirectoryOptions {
            categories: Some(vec!["sci.space".into()]),
            ..Default::default()
        };
        let corpus = Corpus::from_directory(dir.path(), &only_space).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.labels(), vec![0, 0]);
    }

    #[test]
    fn test_json_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        let corpus = Corpus::sample();
        fs::write(&path, corpus.to_json().unwrap()).unwrap();

        let loaded = Corpus::from_json(&path).unwrap();
        assert_eq!(loaded.documents(), corpus.documents());
        assert_eq!(loaded.label_names(), corpus.label_names());
    }

    #[test]
    fn test_missing_directory() {
        let result = Corpus::from_directory("/definitely/not/here", &DirectoryOptions::default());
        assert!(matches!(result, Err(CorpusError::MissingPath(_))));
    }
}

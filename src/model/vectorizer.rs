use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{ModelError, SparseVector};

static TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid token regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// TF-IDF vectorizer fitted by the training pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default = "default_norm")]
    norm: Option<Norm>,
}

fn default_lowercase() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

impl TfidfVectorizer {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.vocabulary.is_empty() {
            return Err(ModelError::invalid("vectorizer", "vocabulary is empty"));
        }
        if self.idf.len() != self.vocabulary.len() {
            return Err(ModelError::invalid(
                "vectorizer",
                format!(
                    "idf has {} weights for {} terms",
                    self.idf.len(),
                    self.vocabulary.len()
                ),
            ));
        }
        if let Some((term, index)) = self
            .vocabulary
            .iter()
            .find(|(_, index)| **index >= self.idf.len())
        {
            return Err(ModelError::invalid(
                "vectorizer",
                format!("term {term:?} maps to out-of-range column {index}"),
            ));
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::invalid("vectorizer", "idf contains non-finite weights"));
        }
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ModelError::invalid(
                "vectorizer",
                format!("bad ngram_range ({min_n}, {max_n})"),
            ));
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let tokens: Vec<&str> = TOKEN_REGEX.find_iter(&text).map(|m| m.as_str()).collect();

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        let (min_n, max_n) = self.ngram_range;
        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                let term = window.join(" ");
                if let Some(&index) = self.vocabulary.get(&term) {
                    *counts.entry(index).or_insert(0.0) += 1.0;
                }
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (index, tf * self.idf[index])
            })
            .collect();

        let norm = match self.norm {
            Some(Norm::L2) => entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
            Some(Norm::L1) => entries.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            None => 1.0,
        };
        if norm > 0.0 {
            for (_, value) in &mut entries {
                *value /= norm;
            }
        }

        SparseVector::from_sorted(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(terms: &[&str], idf: Vec<f64>) -> Result<TfidfVectorizer, ModelError> {
        let vectorizer = TfidfVectorizer {
            vocabulary: terms
                .iter()
                .enumerate()
                .map(|(i, t)| (t.to_string(), i))
                .collect(),
            idf,
            lowercase: default_lowercase(),
            ngram_range: default_ngram_range(),
            sublinear_tf: false,
            norm: default_norm(),
        };
        vectorizer.validate()?;
        Ok(vectorizer)
    }

    #[test]
    fn tokenizes_words_of_two_or_more_chars_case_insensitively() {
        let v = fitted(&["win", "cash", "a"], vec![1.0, 1.0, 1.0]).unwrap();
        let x = v.transform("WIN a Cash prize!! win");

        assert_eq!(x.len(), 2);
        let win = x.get(0).unwrap();
        let cash = x.get(1).unwrap();
        assert!(x.get(2).is_none());
        assert!((win - 2.0 / 5f64.sqrt()).abs() < 1e-12);
        assert!((cash - 1.0 / 5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn out_of_vocabulary_text_yields_empty_row() {
        let v = fitted(&["nasa"], vec![2.0]).unwrap();
        assert_eq!(v.transform("nothing known here").len(), 0);
    }

    #[test]
    fn bigrams_and_sublinear_tf_from_json() {
        let v: TfidfVectorizer = serde_json::from_value(serde_json::json!({
            "vocabulary": {"gift": 0, "gift card": 1},
            "idf": [1.0, 3.0],
            "ngram_range": [1, 2],
            "sublinear_tf": true,
            "norm": null
        }))
        .unwrap();
        v.validate().unwrap();

        let x = v.transform("gift card gift");
        assert!((x.get(0).unwrap() - (1.0 + 2f64.ln())).abs() < 1e-12);
        assert!((x.get(1).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_mismatched_idf() {
        let err = fitted(&["a", "b"], vec![1.0]).unwrap_err();
        assert!(matches!(err, ModelError::Invalid { artifact: "vectorizer", .. }));
    }
}

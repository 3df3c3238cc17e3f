//! TF-IDF vectorization of token documents.
//!
//! Matches the conventions of the common reference vectorizer so that
//! cluster distances stay comparable to the configured bandwidth: raw
//! term counts, smoothed idf `ln((1+n)/(1+df)) + 1`, and L2-normalized
//! rows. Documents are whitespace-tokenized; the normalizer has already
//! done the real tokenization work.

use std::collections::HashMap;

/// Dense TF-IDF matrix: one row per document, one column per vocabulary term.
#[derive(Debug)]
pub struct TfIdfMatrix {
    /// Row vectors, L2-normalized (all-zero rows stay all-zero).
    pub rows: Vec<Vec<f64>>,
    /// Vocabulary size (row dimensionality).
    pub terms: usize,
}

/// Vectorize documents into a dense TF-IDF matrix.
pub fn vectorize(documents: &[String]) -> TfIdfMatrix {
    // Vocabulary: sorted for a stable column order
    let mut vocab: Vec<&str> = documents
        .iter()
        .flat_map(|d| d.split_whitespace())
        .collect();
    vocab.sort_unstable();
    vocab.dedup();
    let term_index: HashMap<&str, usize> = vocab
        .iter()
        .enumerate()
        .map(|(i, &term)| (term, i))
        .collect();

    // Term counts per document
    let counts: Vec<Vec<f64>> = documents
        .iter()
        .map(|doc| {
            let mut row = vec![0.0; vocab.len()];
            for token in doc.split_whitespace() {
                row[term_index[token]] += 1.0;
            }
            row
        })
        .collect();

    // Document frequency per term
    let mut df = vec![0usize; vocab.len()];
    for row in &counts {
        for (term, &count) in row.iter().enumerate() {
            if count > 0.0 {
                df[term] += 1;
            }
        }
    }

    // Smoothed idf
    let n = documents.len() as f64;
    let idf: Vec<f64> = df
        .iter()
        .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
        .collect();

    // Weight and L2-normalize each row
    let rows = counts
        .into_iter()
        .map(|mut row| {
            for (term, value) in row.iter_mut().enumerate() {
                *value *= idf[term];
            }
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for value in &mut row {
                    *value /= norm;
                }
            }
            row
        })
        .collect();

    TfIdfMatrix {
        rows,
        terms: vocab.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn euclidean(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    #[test]
    fn test_empty_corpus() {
        let m = vectorize(&[]);
        assert!(m.rows.is_empty());
        assert_eq!(m.terms, 0);
    }

    #[test]
    fn test_rows_are_unit_length() {
        let docs = vec![
            "budget review meeting".to_string(),
            "budget budget planning".to_string(),
        ];
        let m = vectorize(&docs);
        for row in &m.rows {
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_identical_documents_identical_vectors() {
        let docs = vec!["alpha beta".to_string(), "alpha beta".to_string()];
        let m = vectorize(&docs);
        assert!(euclidean(&m.rows[0], &m.rows[1]) < 1e-12);
    }

    #[test]
    fn test_similar_documents_closer_than_dissimilar() {
        let docs = vec![
            "project kickoff schedule meeting".to_string(),
            "kickoff meeting schedule agenda".to_string(),
            "discount sale offer coupon".to_string(),
        ];
        let m = vectorize(&docs);
        let near = euclidean(&m.rows[0], &m.rows[1]);
        let far = euclidean(&m.rows[0], &m.rows[2]);
        assert!(near < far);
    }

    #[test]
    fn test_empty_document_row_is_zero() {
        let docs = vec!["alpha beta".to_string(), String::new()];
        let m = vectorize(&docs);
        assert!(m.rows[1].iter().all(|&v| v == 0.0));
    }
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`
///
/// Returns `0.0` when either vector has zero magnitude so rankings stay total.
///
/// # Panics
///
/// Panics if the vectors differ in length. Embeddings from one model always
/// share a dimension, so a mismatch is a wiring bug rather than bad input.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(
        a.len(),
        b.len(),
        "cosine similarity requires vectors of equal length"
    );

    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let magnitude_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let magnitude_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot / (magnitude_a * magnitude_b)
}

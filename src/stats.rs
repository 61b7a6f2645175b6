//! Derived similarity statistics

/// Arithmetic mean; `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean of the values that are present; `None` when none are
pub fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    mean(&present)
}

/// Mutation distance implied by a k-mer containment: `1 - c^(1/k)`.
///
/// Defined for `0 < c <= 1` and `k > 0`.
pub fn containment_to_distance(containment: f64, ksize: u32) -> Option<f64> {
    if ksize == 0 || !(containment > 0.0 && containment <= 1.0) {
        return None;
    }
    Some(1.0 - containment.powf(1.0 / ksize as f64))
}

/// ANI estimate from a k-mer containment
pub fn containment_to_ani(containment: f64, ksize: u32) -> Option<f64> {
    containment_to_distance(containment, ksize).map(|d| 1.0 - d)
}

/// dN/dS-like ratio of protein to nucleotide divergence: `(1 - AAI) / (1 - ANI)`
pub fn dnds_ratio(ani: f64, aai: f64) -> Option<f64> {
    let ds = 1.0 - ani;
    if ds == 0.0 || !ds.is_finite() {
        return None;
    }
    let ratio = (1.0 - aai) / ds;
    ratio.is_finite().then_some(ratio)
}

/// Minimum, mean and maximum of a set of ANI values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AniSummary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl AniSummary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let avg = mean(values)?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self { min, avg, max })
    }
}

/// Format an optional value for a CSV cell; missing values become empty cells
pub fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

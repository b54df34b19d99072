//! Gaussian mixture colour models
//!
//! One mixture describes the background colours, another the foreground
//! colours. Components are full-covariance 3-D Gaussians over RGB.

use crate::error::{CutoutError, Result};

/// Variance added to every diagonal entry of a fitted covariance
const COVARIANCE_NOISE: f64 = 0.01;

type Matrix3 = [[f64; 3]; 3];

fn determinant(m: &Matrix3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn inverse(m: &Matrix3, det: f64) -> Matrix3 {
    [
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
        ],
    ]
}

#[derive(Debug, Clone, Default)]
struct Component {
    weight: f64,
    mean: [f64; 3],
    inverse_covariance: Matrix3,
    determinant: f64,
}

impl Component {
    /// Unnormalised density (the constant 2π factor cancels in every ratio we use)
    fn density(&self, color: &[f64; 3]) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        let diff = [
            color[0] - self.mean[0],
            color[1] - self.mean[1],
            color[2] - self.mean[2],
        ];
        let inv = &self.inverse_covariance;
        let mahalanobis = diff[0] * (diff[0] * inv[0][0] + diff[1] * inv[1][0] + diff[2] * inv[2][0])
            + diff[1] * (diff[0] * inv[0][1] + diff[1] * inv[1][1] + diff[2] * inv[2][1])
            + diff[2] * (diff[0] * inv[0][2] + diff[1] * inv[1][2] + diff[2] * inv[2][2]);
        (-0.5 * mahalanobis.max(0.0)).exp() / self.determinant.sqrt()
    }
}

/// Fitted mixture of Gaussians over RGB colours
#[derive(Debug, Clone)]
pub(crate) struct GaussianMixture {
    components: Vec<Component>,
}

impl GaussianMixture {
    #[cfg(test)]
    pub(crate) fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Weighted density of `color` under the whole mixture
    pub(crate) fn probability(&self, color: &[f64; 3]) -> f64 {
        self.components
            .iter()
            .map(|c| c.weight * c.density(color))
            .sum()
    }

    /// Component that explains `color` best, 0 when no component has weight
    pub(crate) fn most_likely_component(&self, color: &[f64; 3]) -> usize {
        let mut best = 0;
        let mut best_density = 0.0;
        for (i, component) in self.components.iter().enumerate() {
            let density = component.density(color);
            if density > best_density {
                best_density = density;
                best = i;
            }
        }
        best
    }
}

/// Accumulates samples per component, then fits a [`GaussianMixture`]
#[derive(Debug, Clone)]
pub(crate) struct MixtureLearner {
    sums: Vec<[f64; 3]>,
    products: Vec<Matrix3>,
    counts: Vec<usize>,
    total: usize,
}

impl MixtureLearner {
    pub(crate) fn new(components: usize) -> Self {
        Self {
            sums: vec![[0.0; 3]; components],
            products: vec![[[0.0; 3]; 3]; components],
            counts: vec![0; components],
            total: 0,
        }
    }

    pub(crate) fn add_sample(&mut self, component: usize, color: &[f64; 3]) {
        let (Some(sum), Some(product), Some(count)) = (
            self.sums.get_mut(component),
            self.products.get_mut(component),
            self.counts.get_mut(component),
        ) else {
            return;
        };
        for i in 0..3 {
            sum[i] += color[i];
            for j in 0..3 {
                product[i][j] += color[i] * color[j];
            }
        }
        *count += 1;
        self.total += 1;
    }

    /// Fit every component with at least one sample; empty components get zero weight
    pub(crate) fn finish(self) -> Result<GaussianMixture> {
        let mut components = Vec::with_capacity(self.counts.len());
        for ((sum, product), &count) in self.sums.iter().zip(&self.products).zip(&self.counts) {
            if count == 0 {
                components.push(Component::default());
                continue;
            }
            let n = count as f64;
            let mean = [sum[0] / n, sum[1] / n, sum[2] / n];
            let mut covariance = [[0.0; 3]; 3];
            for i in 0..3 {
                for j in 0..3 {
                    covariance[i][j] = product[i][j] / n - mean[i] * mean[j];
                }
            }

            // Flat or channel-correlated samples give a singular covariance
            // whose computed determinant is rounding noise of either sign
            for (i, row) in covariance.iter_mut().enumerate() {
                row[i] += COVARIANCE_NOISE;
            }
            let det = determinant(&covariance);
            if !det.is_finite() || det <= 0.0 {
                return Err(CutoutError::segmentation_failure(format!(
                    "degenerate colour statistics (covariance determinant {:e})",
                    det
                )));
            }

            components.push(Component {
                weight: n / self.total as f64,
                mean,
                inverse_covariance: inverse(&covariance, det),
                determinant: det,
            });
        }
        Ok(GaussianMixture { components })
    }
}

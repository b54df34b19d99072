//! Rectangle-seeded GrabCut partitioning
//!
//! Colour statistics inside and outside the seed rectangle are modelled
//! with Gaussian mixtures; each iteration re-estimates the mixtures and
//! solves a min-cut over a data term (mixture likelihoods) plus an
//! 8-connected contrast-sensitive smoothness term.

use super::{
    gmm::{GaussianMixture, MixtureLearner},
    kmeans::{self, KMEANS_ITERATIONS},
    maxflow::FlowGraph,
    PartitionBackend,
};
use crate::{
    config::{DEFAULT_GMM_COMPONENTS, DEFAULT_SMOOTHNESS},
    error::{CutoutError, Result},
    types::{Label, LabelMask, PixelBuffer, SelectionRectangle},
    utils::NumericValidator,
};
use tracing::{debug, trace};

/// GrabCut partition backend
#[derive(Debug, Clone, PartialEq)]
pub struct GrabCutBackend {
    components: usize,
    gamma: f64,
}

impl Default for GrabCutBackend {
    fn default() -> Self {
        Self {
            components: DEFAULT_GMM_COMPONENTS,
            gamma: DEFAULT_SMOOTHNESS,
        }
    }
}

impl GrabCutBackend {
    /// Backend with `components` mixture components per class and smoothness `gamma`
    pub fn new(components: usize, gamma: f64) -> Result<Self> {
        NumericValidator::validate_range(components, 1, 10, "gmm_components")?;
        NumericValidator::validate_finite_positive(gamma, "smoothness")?;
        Ok(Self { components, gamma })
    }

    /// Terminal weight that pins definite labels
    fn hard_constraint(&self) -> f64 {
        8.0 * self.gamma + 1.0
    }

    fn initial_mixtures(
        &self,
        colors: &[[f64; 3]],
        mask: &LabelMask,
    ) -> Result<(GaussianMixture, GaussianMixture)> {
        let mut background = Vec::new();
        let mut foreground = Vec::new();
        for (color, label) in colors.iter().zip(mask.iter()) {
            if label.is_foreground() {
                foreground.push(*color);
            } else {
                background.push(*color);
            }
        }
        if background.is_empty() {
            return Err(CutoutError::segmentation_failure(
                "selection leaves no background pixels to learn from",
            ));
        }
        if foreground.is_empty() {
            return Err(CutoutError::segmentation_failure(
                "selection contains no foreground pixels to learn from",
            ));
        }

        let fit = |samples: &[[f64; 3]]| -> Result<GaussianMixture> {
            let assignment = kmeans::cluster(samples, self.components, KMEANS_ITERATIONS)?;
            let mut learner = MixtureLearner::new(self.components);
            for (color, &component) in samples.iter().zip(&assignment) {
                learner.add_sample(component, color);
            }
            learner.finish()
        };
        Ok((fit(&background)?, fit(&foreground)?))
    }

    fn learn_mixtures(
        &self,
        colors: &[[f64; 3]],
        mask: &LabelMask,
        background: &GaussianMixture,
        foreground: &GaussianMixture,
    ) -> Result<(GaussianMixture, GaussianMixture)> {
        let mut background_learner = MixtureLearner::new(self.components);
        let mut foreground_learner = MixtureLearner::new(self.components);
        for (color, label) in colors.iter().zip(mask.iter()) {
            if label.is_foreground() {
                foreground_learner.add_sample(foreground.most_likely_component(color), color);
            } else {
                background_learner.add_sample(background.most_likely_component(color), color);
            }
        }
        Ok((background_learner.finish()?, foreground_learner.finish()?))
    }

    fn build_graph(
        &self,
        colors: &[[f64; 3]],
        mask: &LabelMask,
        weights: &NeighbourWeights,
        background: &GaussianMixture,
        foreground: &GaussianMixture,
    ) -> Result<FlowGraph> {
        let width = mask.width() as usize;
        let lambda = self.hard_constraint();
        let mut graph = FlowGraph::new(colors.len(), colors.len() * 4);

        for (p, (color, label)) in colors.iter().zip(mask.iter()).enumerate() {
            let (from_source, to_sink) = match label {
                Label::ProbableBackground | Label::ProbableForeground => (
                    negative_log(background.probability(color)),
                    negative_log(foreground.probability(color)),
                ),
                Label::DefiniteBackground => (0.0, lambda),
                Label::DefiniteForeground => (lambda, 0.0),
            };
            if !from_source.is_finite() || !to_sink.is_finite() {
                return Err(CutoutError::segmentation_failure(format!(
                    "non-finite data term at pixel {}",
                    p
                )));
            }
            graph.add_terminal_weights(p, from_source, to_sink);

            let x = p % width;
            let y = p / width;
            if x > 0 {
                let w = weights.left[p];
                graph.add_edge_pair(p, p - 1, w, w);
            }
            if x > 0 && y > 0 {
                let w = weights.up_left[p];
                graph.add_edge_pair(p, p - width - 1, w, w);
            }
            if y > 0 {
                let w = weights.up[p];
                graph.add_edge_pair(p, p - width, w, w);
            }
            if x + 1 < width && y > 0 {
                let w = weights.up_right[p];
                graph.add_edge_pair(p, p - width + 1, w, w);
            }
        }
        Ok(graph)
    }
}

impl PartitionBackend for GrabCutBackend {
    fn name(&self) -> &'static str {
        "grabcut"
    }

    fn refine(
        &self,
        image: &PixelBuffer,
        rect: &SelectionRectangle,
        iterations: u32,
        mask: &mut LabelMask,
    ) -> Result<()> {
        let (width, height) = image.dimensions();
        if mask.dimensions() != (width, height) {
            return Err(CutoutError::precondition(format!(
                "mask is {}x{} but image is {}x{}",
                mask.width(),
                mask.height(),
                width,
                height
            )));
        }
        // Graph indices are u32 and every pixel owns at most ten arcs
        let pixels = image.pixel_count();
        NumericValidator::pixel_count_to_u32(pixels, 2)?;
        if pixels > (u32::MAX / 10) as usize {
            return Err(CutoutError::segmentation_failure(format!(
                "image with {} pixels is too large to segment",
                pixels
            )));
        }

        mask.fill_rect(rect, Label::ProbableForeground)?;

        let colors: Vec<[f64; 3]> = image
            .as_raw()
            .chunks_exact(3)
            .map(|p| [f64::from(p[0]), f64::from(p[1]), f64::from(p[2])])
            .collect();

        let (mut background, mut foreground) = self.initial_mixtures(&colors, mask)?;
        let weights = NeighbourWeights::compute(&colors, width as usize, height as usize, self.gamma);
        trace!(beta = weights.beta, "smoothness contrast estimated");

        for iteration in 0..iterations {
            (background, foreground) =
                self.learn_mixtures(&colors, mask, &background, &foreground)?;

            let mut graph =
                self.build_graph(&colors, mask, &weights, &background, &foreground)?;
            let flow = graph.max_flow();
            if !flow.is_finite() {
                return Err(CutoutError::segmentation_failure("min-cut diverged"));
            }

            for (p, label) in mask.as_array_mut().iter_mut().enumerate() {
                if label.is_probable() {
                    *label = if graph.in_source_segment(p) {
                        Label::ProbableForeground
                    } else {
                        Label::ProbableBackground
                    };
                }
            }

            debug!(
                iteration = iteration + 1,
                flow,
                probable_foreground = mask.count(Label::ProbableForeground),
                "partition iteration finished"
            );
        }
        Ok(())
    }
}

fn negative_log(probability: f64) -> f64 {
    -probability.max(f64::MIN_POSITIVE).ln()
}

/// Contrast-sensitive n-link capacities, indexed by the later pixel of each pair
struct NeighbourWeights {
    beta: f64,
    left: Vec<f64>,
    up_left: Vec<f64>,
    up: Vec<f64>,
    up_right: Vec<f64>,
}

impl NeighbourWeights {
    fn compute(colors: &[[f64; 3]], width: usize, height: usize, gamma: f64) -> Self {
        let distance = |a: usize, b: usize| -> f64 {
            let (ca, cb) = (colors[a], colors[b]);
            let d = [ca[0] - cb[0], ca[1] - cb[1], ca[2] - cb[2]];
            d[0] * d[0] + d[1] * d[1] + d[2] * d[2]
        };

        // beta = 1 / (2 * mean squared colour difference between neighbours)
        let mut total = 0.0;
        let mut pairs = 0usize;
        for y in 0..height {
            for x in 0..width {
                let p = y * width + x;
                if x > 0 {
                    total += distance(p, p - 1);
                    pairs += 1;
                }
                if x > 0 && y > 0 {
                    total += distance(p, p - width - 1);
                    pairs += 1;
                }
                if y > 0 {
                    total += distance(p, p - width);
                    pairs += 1;
                }
                if y > 0 && x + 1 < width {
                    total += distance(p, p - width + 1);
                    pairs += 1;
                }
            }
        }
        let beta = if pairs == 0 || total <= f64::EPSILON {
            0.0
        } else {
            1.0 / (2.0 * total / pairs as f64)
        };

        let diagonal_gamma = gamma / std::f64::consts::SQRT_2;
        let n = width * height;
        let mut weights = Self {
            beta,
            left: vec![0.0; n],
            up_left: vec![0.0; n],
            up: vec![0.0; n],
            up_right: vec![0.0; n],
        };
        for y in 0..height {
            for x in 0..width {
                let p = y * width + x;
                if x > 0 {
                    weights.left[p] = gamma * (-beta * distance(p, p - 1)).exp();
                }
                if x > 0 && y > 0 {
                    weights.up_left[p] = diagonal_gamma * (-beta * distance(p, p - width - 1)).exp();
                }
                if y > 0 {
                    weights.up[p] = gamma * (-beta * distance(p, p - width)).exp();
                }
                if y > 0 && x + 1 < width {
                    weights.up_right[p] = diagonal_gamma * (-beta * distance(p, p - width + 1)).exp();
                }
            }
        }
        weights
    }
}

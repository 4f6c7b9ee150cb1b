use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-topology feedforward network: 2 inputs → 3 hidden (sigmoid) → 1 output (sigmoid).
/// Stack-allocated, no heap. 13 parameters total.
///
/// Inputs:  surface coordinate (x, y) scaled into network space
/// Output:  one activation in (0, 1), mapped to a surface height by the sampler
pub const INPUT_SIZE: usize = 2;
pub const HIDDEN_SIZE: usize = 3;

/// Absolute bound applied to every weight and bias at every write.
pub const WEIGHT_LIMIT: f64 = 3.0;

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Clamp a candidate weight into `[-WEIGHT_LIMIT, WEIGHT_LIMIT]`.
/// NaN maps to 0.0 so the invariant holds for any input.
pub fn clamp_weight(v: f64) -> f64 {
    clamp_to(v, WEIGHT_LIMIT)
}

pub(crate) fn clamp_to(v: f64, limit: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-limit, limit)
    }
}

/// Pre-activations are summed at this scale so that `x * w` terms of opposite
/// sign cannot both overflow to infinity and cancel into NaN.
const PREACTIVATION_SCALE: f64 = 0.125;

/// Weights are only writable through clamping paths; deserialization clamps too.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawWeightSet")]
pub struct WeightSet {
    // input→hidden (2×3) + hidden bias (3) + hidden→output (3) + output bias (1)
    pub(crate) input_to_hidden: [[f64; HIDDEN_SIZE]; INPUT_SIZE],
    pub(crate) hidden_bias: [f64; HIDDEN_SIZE],
    pub(crate) hidden_to_output: [f64; HIDDEN_SIZE],
    pub(crate) output_bias: f64,
}

#[derive(Deserialize)]
struct RawWeightSet {
    input_to_hidden: [[f64; HIDDEN_SIZE]; INPUT_SIZE],
    hidden_bias: [f64; HIDDEN_SIZE],
    hidden_to_output: [f64; HIDDEN_SIZE],
    output_bias: f64,
}

impl From<RawWeightSet> for WeightSet {
    fn from(raw: RawWeightSet) -> Self {
        let mut weights = Self {
            input_to_hidden: raw.input_to_hidden,
            hidden_bias: raw.hidden_bias,
            hidden_to_output: raw.hidden_to_output,
            output_bias: raw.output_bias,
        };
        weights.clamp_all(WEIGHT_LIMIT);
        weights
    }
}

impl Default for WeightSet {
    fn default() -> Self {
        Self {
            input_to_hidden: [[1.0, 1.0, 1.0], [-1.0, -1.0, -1.0]],
            hidden_bias: [0.0; HIDDEN_SIZE],
            hidden_to_output: [1.0, -1.0, 1.0],
            output_bias: 0.0,
        }
    }
}

impl WeightSet {
    pub const WEIGHT_COUNT: usize =
        INPUT_SIZE * HIDDEN_SIZE + HIDDEN_SIZE + HIDDEN_SIZE + 1;

    /// Create a weight set from an iterator of f64 values, clamping each one.
    /// Panics if fewer than WEIGHT_COUNT values.
    pub fn from_weights(mut weights: impl Iterator<Item = f64>) -> Self {
        let mut next = || {
            clamp_weight(
                weights
                    .next()
                    .expect("insufficient weights: need WEIGHT_COUNT (13) elements"),
            )
        };

        let mut input_to_hidden = [[0.0f64; HIDDEN_SIZE]; INPUT_SIZE];
        for row in &mut input_to_hidden {
            for w in row.iter_mut() {
                *w = next();
            }
        }
        let mut hidden_bias = [0.0f64; HIDDEN_SIZE];
        for b in &mut hidden_bias {
            *b = next();
        }
        let mut hidden_to_output = [0.0f64; HIDDEN_SIZE];
        for w in &mut hidden_to_output {
            *w = next();
        }
        let output_bias = next();

        Self {
            input_to_hidden,
            hidden_bias,
            hidden_to_output,
            output_bias,
        }
    }

    /// Flatten in `WeightParam::ALL` order.
    pub fn to_weight_vec(&self) -> Vec<f64> {
        WeightParam::ALL.iter().map(|&p| self.get(p)).collect()
    }

    pub(crate) fn clamp_all(&mut self, limit: f64) {
        for row in &mut self.input_to_hidden {
            for w in row.iter_mut() {
                *w = clamp_to(*w, limit);
            }
        }
        for b in &mut self.hidden_bias {
            *b = clamp_to(*b, limit);
        }
        for w in &mut self.hidden_to_output {
            *w = clamp_to(*w, limit);
        }
        self.output_bias = clamp_to(self.output_bias, limit);
    }

    pub fn input_to_hidden(&self) -> &[[f64; HIDDEN_SIZE]; INPUT_SIZE] {
        &self.input_to_hidden
    }

    pub fn hidden_bias(&self) -> &[f64; HIDDEN_SIZE] {
        &self.hidden_bias
    }

    pub fn hidden_to_output(&self) -> &[f64; HIDDEN_SIZE] {
        &self.hidden_to_output
    }

    pub fn output_bias(&self) -> f64 {
        self.output_bias
    }

    pub fn get(&self, param: WeightParam) -> f64 {
        match param {
            WeightParam::InputToHidden { input, hidden } => self.input_to_hidden[input][hidden],
            WeightParam::HiddenBias(j) => self.hidden_bias[j],
            WeightParam::HiddenToOutput(j) => self.hidden_to_output[j],
            WeightParam::OutputBias => self.output_bias,
        }
    }

    /// Write one scalar, clamped to `[-limit, limit]`. Returns the stored value.
    pub(crate) fn set_clamped(&mut self, param: WeightParam, value: f64, limit: f64) -> f64 {
        let v = clamp_to(value, limit);
        match param {
            WeightParam::InputToHidden { input, hidden } => self.input_to_hidden[input][hidden] = v,
            WeightParam::HiddenBias(j) => self.hidden_bias[j] = v,
            WeightParam::HiddenToOutput(j) => self.hidden_to_output[j] = v,
            WeightParam::OutputBias => self.output_bias = v,
        }
        v
    }

    /// Panics if `param` is out of range; check with [`WeightParam::is_valid`] first.
    pub fn set(&mut self, param: WeightParam, value: f64) -> f64 {
        self.set_clamped(param, value, WEIGHT_LIMIT)
    }

    /// One random-walk step: nudges every connection weight by a uniform delta in
    /// `[-step, step]` and clamps to `[-limit, limit]`. Biases are left alone.
    pub fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R, step: f64, limit: f64) {
        for row in &mut self.input_to_hidden {
            for w in row.iter_mut() {
                let delta = rng.random_range(-step..=step);
                *w = clamp_to(*w + delta, limit);
            }
        }
        for w in &mut self.hidden_to_output {
            let delta = rng.random_range(-step..=step);
            *w = clamp_to(*w + delta, limit);
        }
    }

    pub fn hidden_activations(&self, x1: f64, x2: f64) -> [f64; HIDDEN_SIZE] {
        let s = PREACTIVATION_SCALE;
        let (x1, x2) = (x1 * s, x2 * s);
        let mut hidden = [0.0f64; HIDDEN_SIZE];
        for (j, h) in hidden.iter_mut().enumerate() {
            let scaled = x1 * self.input_to_hidden[0][j]
                + x2 * self.input_to_hidden[1][j]
                + self.hidden_bias[j] * s;
            *h = sigmoid(scaled / s);
        }
        hidden
    }

    /// Forward pass. Output is in (0, 1) for all finite inputs: saturated hidden
    /// units stay in [0, 1], so the output pre-activation is bounded by the limit.
    pub fn forward(&self, x1: f64, x2: f64) -> f64 {
        let hidden = self.hidden_activations(x1, x2);
        let sum = hidden
            .iter()
            .zip(self.hidden_to_output.iter())
            .fold(self.output_bias, |acc, (h, w)| acc + h * w);
        sigmoid(sum)
    }
}

/// Free-function form of [`WeightSet::forward`].
pub fn forward(x1: f64, x2: f64, weights: &WeightSet) -> f64 {
    weights.forward(x1, x2)
}

/// Names a single scalar of a [`WeightSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightParam {
    InputToHidden { input: usize, hidden: usize },
    HiddenBias(usize),
    HiddenToOutput(usize),
    OutputBias,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidWeightIndex {
    pub index: usize,
}

impl fmt::Display for InvalidWeightIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "weight index {} out of range (0..{})",
            self.index,
            WeightSet::WEIGHT_COUNT
        )
    }
}

impl std::error::Error for InvalidWeightIndex {}

impl WeightParam {
    /// Flat order: w_ih row-major, hidden biases, w_ho, output bias.
    pub const ALL: [WeightParam; WeightSet::WEIGHT_COUNT] = [
        WeightParam::InputToHidden { input: 0, hidden: 0 },
        WeightParam::InputToHidden { input: 0, hidden: 1 },
        WeightParam::InputToHidden { input: 0, hidden: 2 },
        WeightParam::InputToHidden { input: 1, hidden: 0 },
        WeightParam::InputToHidden { input: 1, hidden: 1 },
        WeightParam::InputToHidden { input: 1, hidden: 2 },
        WeightParam::HiddenBias(0),
        WeightParam::HiddenBias(1),
        WeightParam::HiddenBias(2),
        WeightParam::HiddenToOutput(0),
        WeightParam::HiddenToOutput(1),
        WeightParam::HiddenToOutput(2),
        WeightParam::OutputBias,
    ];

    pub fn from_index(index: usize) -> Result<Self, InvalidWeightIndex> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(InvalidWeightIndex { index })
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            WeightParam::InputToHidden { input, hidden } => {
                input < INPUT_SIZE && hidden < HIDDEN_SIZE
            }
            WeightParam::HiddenBias(j) | WeightParam::HiddenToOutput(j) => j < HIDDEN_SIZE,
            WeightParam::OutputBias => true,
        }
    }

    /// Slider label: `w11`..`w23`, `b1`..`b3`, `v1`..`v3`, `output_b`.
    pub fn label(&self) -> String {
        match *self {
            WeightParam::InputToHidden { input, hidden } => format!("w{}{}", input + 1, hidden + 1),
            WeightParam::HiddenBias(j) => format!("b{}", j + 1),
            WeightParam::HiddenToOutput(j) => format!("v{}", j + 1),
            WeightParam::OutputBias => "output_b".to_string(),
        }
    }

    /// Whether auto-perturbation touches this parameter.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            WeightParam::InputToHidden { .. } | WeightParam::HiddenToOutput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn default_weights_at_origin_match_hand_computation() {
        let w = WeightSet::default();
        let h = w.hidden_activations(0.0, 0.0);
        assert!(h.iter().all(|&v| (v - 0.5).abs() < 1e-12));
        let out = w.forward(0.0, 0.0);
        assert!((out - sigmoid(0.5)).abs() < 1e-12);
        assert!((out - 0.6225).abs() < 1e-4);
    }

    #[test]
    fn output_stays_strictly_inside_unit_interval() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        for _ in 0..500 {
            let w = WeightSet::from_weights(
                (0..WeightSet::WEIGHT_COUNT).map(|_| rng.random_range(-3.0..=3.0)),
            );
            let x1 = rng.random_range(-10.0..=10.0);
            let x2 = rng.random_range(-10.0..=10.0);
            let out = w.forward(x1, x2);
            assert!(out > 0.0 && out < 1.0, "out={out}");
        }
    }

    #[test]
    fn extreme_inputs_saturate_without_leaving_unit_interval() {
        let extremes = [
            0.0,
            1e300,
            -1e300,
            f64::MAX,
            f64::MIN,
            f64::MIN_POSITIVE,
        ];
        let mut weight_sets = Vec::new();
        for sign in [1.0, -1.0] {
            // Opposite-sign input weights: x1 * w1 and x2 * w2 overflow in opposite directions.
            weight_sets.push(WeightSet::from_weights(
                [3.0, 3.0, 3.0, -3.0, -3.0, -3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0]
                    .into_iter()
                    .map(|v| v * sign),
            ));
            weight_sets.push(WeightSet::from_weights(
                std::iter::repeat_n(3.0 * sign, WeightSet::WEIGHT_COUNT),
            ));
        }
        for w in &weight_sets {
            for &x1 in &extremes {
                for &x2 in &extremes {
                    let h = w.hidden_activations(x1, x2);
                    assert!(h.iter().all(|v| (0.0..=1.0).contains(v)), "h={h:?}");
                    let out = w.forward(x1, x2);
                    assert!(out > 0.0 && out < 1.0, "x1={x1} x2={x2} out={out}");
                }
            }
        }
    }

    #[test]
    fn deserialized_weights_are_clamped() {
        let json = r#"{
            "input_to_hidden": [[40.0, 1.0, 1.0], [-1.0, -1.0, -90.0]],
            "hidden_bias": [0.0, 0.0, 5.0],
            "hidden_to_output": [1.0, -1.0, 1.0],
            "output_bias": -4.0
        }"#;
        let w: WeightSet = serde_json::from_str(json).expect("weights should parse");
        assert_eq!(w.input_to_hidden()[0][0], 3.0);
        assert_eq!(w.input_to_hidden()[1][2], -3.0);
        assert_eq!(w.hidden_bias()[2], 3.0);
        assert_eq!(w.output_bias(), -3.0);
    }

    #[test]
    fn forward_is_deterministic() {
        let w = WeightSet::from_weights(
            [0.3, -1.2, 2.0, 0.7, 0.1, -2.9, 0.5, -0.5, 1.0, 2.5, -0.25, 1.5, -1.0].into_iter(),
        );
        let a = forward(0.37, -1.9, &w);
        let b = forward(0.37, -1.9, &w);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn clamp_is_identity_inside_range_and_saturates_outside() {
        for v in [-3.0, -2.5, 0.0, 1.234, 3.0] {
            assert_eq!(clamp_weight(v), v);
            assert_eq!(clamp_weight(clamp_weight(v)), v);
        }
        assert_eq!(clamp_weight(3.0001), 3.0);
        assert_eq!(clamp_weight(1e9), 3.0);
        assert_eq!(clamp_weight(f64::INFINITY), 3.0);
        assert_eq!(clamp_weight(-7.5), -3.0);
        assert_eq!(clamp_weight(f64::NEG_INFINITY), -3.0);
        assert_eq!(clamp_weight(f64::NAN), 0.0);
    }

    #[test]
    fn perturb_leaves_biases_and_respects_limit() {
        let mut w = WeightSet::default();
        w.set(WeightParam::HiddenBias(0), 0.4);
        w.set(WeightParam::HiddenBias(1), -0.2);
        w.set(WeightParam::HiddenBias(2), 1.1);
        w.set(WeightParam::OutputBias, -0.7);
        let mut rng = ChaCha12Rng::seed_from_u64(42);
        for _ in 0..5_000 {
            w.perturb(&mut rng, 0.05, WEIGHT_LIMIT);
        }
        assert_eq!(w.hidden_bias(), &[0.4, -0.2, 1.1]);
        assert_eq!(w.output_bias(), -0.7);
        assert!(w
            .to_weight_vec()
            .iter()
            .all(|v| (-WEIGHT_LIMIT..=WEIGHT_LIMIT).contains(v)));
    }

    #[test]
    fn perturb_moves_each_connection_by_at_most_step() {
        let before = WeightSet::default();
        let mut after = before.clone();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        after.perturb(&mut rng, 0.05, WEIGHT_LIMIT);
        for p in WeightParam::ALL.iter().filter(|p| p.is_connection()) {
            assert!((after.get(*p) - before.get(*p)).abs() <= 0.05 + 1e-12);
        }
    }

    #[test]
    fn flat_index_order_round_trips_through_weight_vec() {
        let values: Vec<f64> = (0..WeightSet::WEIGHT_COUNT).map(|i| i as f64 * 0.1).collect();
        let w = WeightSet::from_weights(values.iter().copied());
        assert_eq!(w.to_weight_vec(), values);
        assert_eq!(w.input_to_hidden()[1][2], values[5]);
        assert_eq!(w.hidden_to_output()[0], values[9]);
        assert_eq!(w.output_bias(), values[12]);
    }

    #[test]
    fn from_weights_clamps_out_of_range_values() {
        let w = WeightSet::from_weights(std::iter::repeat_n(9.0, WeightSet::WEIGHT_COUNT));
        assert!(w.to_weight_vec().iter().all(|&v| v == 3.0));
    }

    #[test]
    fn labels_follow_slider_naming() {
        assert_eq!(WeightParam::InputToHidden { input: 1, hidden: 2 }.label(), "w23");
        assert_eq!(WeightParam::HiddenToOutput(0).label(), "v1");
        assert_eq!(WeightParam::HiddenBias(2).label(), "b3");
        assert_eq!(WeightParam::OutputBias.label(), "output_b");
        assert!(WeightParam::from_index(13).is_err());
        assert!(!WeightParam::HiddenBias(3).is_valid());
    }
}

//! Node/edge description of the 2-3-1 network for a 400×300 view box.
//!
//! Edge width grows with weight magnitude; color encodes sign.

use crate::nn::{WeightParam, WeightSet, HIDDEN_SIZE, INPUT_SIZE};
use serde::Serialize;

pub const VIEW_BOX: (f64, f64) = (400.0, 300.0);
pub const POSITIVE_COLOR: &str = "#3b82f6";
pub const NEGATIVE_COLOR: &str = "#ef4444";

const INPUT_X: f64 = 80.0;
const HIDDEN_X: f64 = 200.0;
const OUTPUT_X: f64 = 320.0;
const INPUT_RADIUS: f64 = 12.0;
const OUTPUT_RADIUS: f64 = 15.0;
const SLIDER_STEP: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Input,
    Hidden,
    Output,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagramNode {
    pub label: String,
    pub layer: Layer,
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagramEdge {
    pub param: WeightParam,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub stroke: &'static str,
    pub stroke_width: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SliderReadout {
    pub param: WeightParam,
    pub label: String,
    pub value: f64,
    /// Value formatted to two decimals.
    pub display: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub disabled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NetworkDiagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    pub sliders: Vec<SliderReadout>,
}

pub fn edge_color(weight: f64) -> &'static str {
    if weight >= 0.0 {
        POSITIVE_COLOR
    } else {
        NEGATIVE_COLOR
    }
}

pub fn edge_width(weight: f64) -> f64 {
    weight.abs() * 1.5 + 0.5
}

fn input_y(i: usize) -> f64 {
    100.0 + i as f64 * 100.0
}

fn hidden_y(j: usize) -> f64 {
    50.0 + j as f64 * 100.0
}

fn output_y() -> f64 {
    150.0
}

impl NetworkDiagram {
    /// Build the diagram for a weight snapshot. `locked` marks every slider
    /// disabled, as it is while auto mode runs.
    pub fn build(weights: &WeightSet, weight_limit: f64, locked: bool) -> Self {
        let mut nodes = Vec::with_capacity(INPUT_SIZE + HIDDEN_SIZE + 1);
        for i in 0..INPUT_SIZE {
            nodes.push(DiagramNode {
                label: format!("X{}", i + 1),
                layer: Layer::Input,
                cx: INPUT_X,
                cy: input_y(i),
                r: INPUT_RADIUS,
            });
        }
        for j in 0..HIDDEN_SIZE {
            nodes.push(DiagramNode {
                label: format!("H{}", j + 1),
                layer: Layer::Hidden,
                cx: HIDDEN_X,
                cy: hidden_y(j),
                r: INPUT_RADIUS,
            });
        }
        nodes.push(DiagramNode {
            label: "Y".to_string(),
            layer: Layer::Output,
            cx: OUTPUT_X,
            cy: output_y(),
            r: OUTPUT_RADIUS,
        });

        let mut edges = Vec::with_capacity(INPUT_SIZE * HIDDEN_SIZE + HIDDEN_SIZE);
        for (i, row) in weights.input_to_hidden.iter().enumerate() {
            for (j, &w) in row.iter().enumerate() {
                edges.push(DiagramEdge {
                    param: WeightParam::InputToHidden {
                        input: i,
                        hidden: j,
                    },
                    x1: INPUT_X,
                    y1: input_y(i),
                    x2: HIDDEN_X,
                    y2: hidden_y(j),
                    stroke: edge_color(w),
                    stroke_width: edge_width(w),
                });
            }
        }
        for (j, &w) in weights.hidden_to_output.iter().enumerate() {
            edges.push(DiagramEdge {
                param: WeightParam::HiddenToOutput(j),
                x1: HIDDEN_X,
                y1: hidden_y(j),
                x2: OUTPUT_X,
                y2: output_y(),
                stroke: edge_color(w),
                stroke_width: edge_width(w),
            });
        }

        // Hidden biases have no slider in the panel.
        let sliders = WeightParam::ALL
            .iter()
            .filter(|p| !matches!(p, WeightParam::HiddenBias(_)))
            .map(|&param| {
                let value = weights.get(param);
                SliderReadout {
                    param,
                    label: param.label(),
                    value,
                    display: format!("{value:.2}"),
                    min: -weight_limit,
                    max: weight_limit,
                    step: SLIDER_STEP,
                    disabled: locked,
                }
            })
            .collect();

        Self {
            nodes,
            edges,
            sliders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_diagram_has_expected_shape() {
        let d = NetworkDiagram::build(&WeightSet::default(), 3.0, false);
        assert_eq!(d.nodes.len(), 6);
        assert_eq!(d.edges.len(), 9);
        assert_eq!(d.sliders.len(), 10);
        let labels: Vec<&str> = d.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, ["X1", "X2", "H1", "H2", "H3", "Y"]);
        assert_eq!(d.nodes[5].r, 15.0);
    }

    #[test]
    fn edges_encode_sign_and_magnitude() {
        let d = NetworkDiagram::build(&WeightSet::default(), 3.0, false);
        // w11 = 1.0
        assert_eq!(d.edges[0].stroke, POSITIVE_COLOR);
        assert_eq!(d.edges[0].stroke_width, 2.0);
        // w21 = -1.0
        assert_eq!(d.edges[3].stroke, NEGATIVE_COLOR);
        assert_eq!((d.edges[3].x1, d.edges[3].y1), (80.0, 200.0));
        assert_eq!((d.edges[3].x2, d.edges[3].y2), (200.0, 50.0));
        // v2 = -1.0 into the output node
        assert_eq!(d.edges[7].param, WeightParam::HiddenToOutput(1));
        assert_eq!(d.edges[7].stroke, NEGATIVE_COLOR);
        assert_eq!((d.edges[7].x2, d.edges[7].y2), (320.0, 150.0));
        assert_eq!(edge_width(0.0), 0.5);
        assert_eq!(edge_color(0.0), POSITIVE_COLOR);
    }

    #[test]
    fn sliders_format_and_lock() {
        let mut w = WeightSet::default();
        w.set(WeightParam::OutputBias, -0.456);
        let d = NetworkDiagram::build(&w, 3.0, true);
        let last = d.sliders.last().unwrap();
        assert_eq!(last.label, "output_b");
        assert_eq!(last.display, "-0.46");
        assert!(d.sliders.iter().all(|s| s.disabled));
        assert_eq!((d.sliders[0].min, d.sliders[0].max), (-3.0, 3.0));
    }
}

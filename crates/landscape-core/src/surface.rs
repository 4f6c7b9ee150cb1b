use crate::config::LandscapeConfig;
use crate::nn::WeightSet;
use serde::Serialize;

/// Character ramp for terminal rendering, lowest height first.
const ASCII_RAMP: &[u8] = b" .:-=+*#%@";

/// One lattice point of the sampled surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GridSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Height statistics for one resampling pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SurfaceStats {
    pub min_height: f64,
    pub max_height: f64,
    pub mean_height: f64,
}

/// Planar mesh deformed by the network output.
///
/// Vertices are stored row-major, top row (y = +extent/2) first, x increasing
/// left to right within a row.
#[derive(Clone, Debug)]
pub struct SurfaceMesh {
    segments: usize,
    input_scale: f64,
    height_scale: f64,
    height_offset: f64,
    vertices: Vec<GridSample>,
}

impl SurfaceMesh {
    pub fn new(config: &LandscapeConfig) -> Self {
        let segments = config.grid_segments;
        let resolution = segments + 1;
        let half = config.extent / 2.0;
        let step = config.extent / segments as f64;

        let mut vertices = Vec::with_capacity(resolution * resolution);
        for iy in 0..resolution {
            let y = half - iy as f64 * step;
            for ix in 0..resolution {
                let x = ix as f64 * step - half;
                vertices.push(GridSample { x, y, z: 0.0 });
            }
        }

        Self {
            segments,
            input_scale: config.input_scale,
            height_scale: config.height_scale,
            height_offset: config.height_offset,
            vertices,
        }
    }

    /// Vertices per side.
    pub fn resolution(&self) -> usize {
        self.segments + 1
    }

    pub fn vertices(&self) -> &[GridSample] {
        &self.vertices
    }

    pub fn vertex(&self, ix: usize, iy: usize) -> Option<&GridSample> {
        let n = self.resolution();
        if ix >= n || iy >= n {
            return None;
        }
        self.vertices.get(iy * n + ix)
    }

    /// Height for a network output in (0, 1).
    pub fn height_for(&self, output: f64) -> f64 {
        output * self.height_scale - self.height_offset
    }

    /// Lowest and highest reachable heights, exclusive.
    pub fn height_range(&self) -> (f64, f64) {
        let a = self.height_for(0.0);
        let b = self.height_for(1.0);
        (a.min(b), a.max(b))
    }

    /// Re-evaluate the network at every vertex and overwrite its height.
    /// No state is carried over from the previous pass.
    pub fn resample(&mut self, weights: &WeightSet) -> SurfaceStats {
        let mut min_height = f64::INFINITY;
        let mut max_height = f64::NEG_INFINITY;
        let mut sum = 0.0;

        let input_scale = self.input_scale;
        let height_scale = self.height_scale;
        let height_offset = self.height_offset;
        for v in &mut self.vertices {
            let out = weights.forward(v.x / input_scale, v.y / input_scale);
            v.z = out * height_scale - height_offset;
            min_height = min_height.min(v.z);
            max_height = max_height.max(v.z);
            sum += v.z;
        }

        SurfaceStats {
            min_height,
            max_height,
            mean_height: sum / self.vertices.len() as f64,
        }
    }

    /// Render heights as a character ramp, one line per `stride`-th row.
    pub fn render_ascii(&self, stride: usize) -> String {
        let stride = stride.max(1);
        let n = self.resolution();
        let (lo, hi) = self.height_range();
        let span = (hi - lo).max(f64::EPSILON);
        let last = ASCII_RAMP.len() - 1;

        let mut out = String::with_capacity((n / stride + 1) * (n / stride + 2));
        for row in self.vertices.chunks(n).step_by(stride) {
            for v in row.iter().step_by(stride) {
                let t = ((v.z - lo) / span).clamp(0.0, 1.0);
                let idx = (t * last as f64).round() as usize;
                out.push(ASCII_RAMP[idx.min(last)] as char);
            }
            out.push('\n');
        }
        out
    }
}

//! Piecewise-linear polyline mapping a 1-D road offset to a 2-D planar
//! coordinate (spec §3 Shape, component B).

#[derive(Debug, Clone)]
pub struct Shape {
    /// Ordered polyline vertices. A road with no declared shape gets a
    /// straight two-point line of its own length in `Shape::straight`.
    pub vertices: Vec<(f64, f64)>,
}

impl Shape {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        assert!(vertices.len() >= 2, "a Shape needs at least two vertices");
        Self { vertices }
    }

    /// A straight line from the origin along the x axis, `length` meters
    /// long. Used when a scenario road has no explicit geometry.
    pub fn straight(length: f64) -> Self {
        Self::new(vec![(0.0, 0.0), (length, 0.0)])
    }

    pub fn total_length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|pair| segment_length(pair[0], pair[1]))
            .sum()
    }

    /// Maps an offset along the polyline (clamped to `[0, total_length()]`)
    /// to its planar coordinate.
    pub fn point_at(&self, offset: f64) -> (f64, f64) {
        let total = self.total_length();
        let offset = offset.clamp(0.0, total.max(0.0));

        let mut remaining = offset;
        for pair in self.vertices.windows(2) {
            let seg_len = segment_length(pair[0], pair[1]);
            if remaining <= seg_len || seg_len == 0.0 {
                let t = if seg_len > 0.0 { remaining / seg_len } else { 0.0 };
                let (x0, y0) = pair[0];
                let (x1, y1) = pair[1];
                return (x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
            }
            remaining -= seg_len;
        }
        *self.vertices.last().unwrap()
    }
}

fn segment_length(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

use coreg_core::Point2;

/// Similarity transform: uniform scale, rotation, and translation (4 DOF),
/// stored as the linear part `[[a, -b], [b, a]]` plus a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform {
    a: f64,
    b: f64,
    tx: f64,
    ty: f64,
}

impl SimilarityTransform {
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, tx: 0.0, ty: 0.0 }
    }

    pub fn from_parts(scale: f64, rotation: f64, translation: (f64, f64)) -> Self {
        Self {
            a: scale * rotation.cos(),
            b: scale * rotation.sin(),
            tx: translation.0,
            ty: translation.1,
        }
    }

    /// Least-squares fit mapping `src` onto `dst`. Closed form for the
    /// 4-DOF model; exact when the system is consistent. Returns `None`
    /// for fewer than 2 points or when the source points coincide.
    pub fn fit(src: &[Point2], dst: &[Point2]) -> Option<Self> {
        if src.len() < 2 || src.len() != dst.len() {
            return None;
        }

        let n = src.len() as f64;
        let (mut sx, mut sy, mut dx, mut dy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for (s, d) in src.iter().zip(dst.iter()) {
            sx += s.x as f64;
            sy += s.y as f64;
            dx += d.x as f64;
            dy += d.y as f64;
        }
        let (sx, sy, dx, dy) = (sx / n, sy / n, dx / n, dy / n);

        let mut cross_aa = 0.0f64; // sum of x'u' + y'v'
        let mut cross_bb = 0.0f64; // sum of x'v' - y'u'
        let mut norm = 0.0f64; // sum of x'^2 + y'^2
        for (s, d) in src.iter().zip(dst.iter()) {
            let (px, py) = (s.x as f64 - sx, s.y as f64 - sy);
            let (qx, qy) = (d.x as f64 - dx, d.y as f64 - dy);
            cross_aa += px * qx + py * qy;
            cross_bb += px * qy - py * qx;
            norm += px * px + py * py;
        }

        if norm < 1e-12 {
            return None;
        }

        let a = cross_aa / norm;
        let b = cross_bb / norm;
        Some(Self {
            a,
            b,
            tx: dx - a * sx + b * sy,
            ty: dy - b * sx - a * sy,
        })
    }

    #[inline]
    pub fn apply(&self, p: Point2) -> Point2 {
        let (x, y) = (p.x as f64, p.y as f64);
        Point2 {
            x: (self.a * x - self.b * y + self.tx) as f32,
            y: (self.b * x + self.a * y + self.ty) as f32,
        }
    }

    /// Euclidean distance between `transform(src)` and `dst`.
    pub fn residual(&self, src: Point2, dst: Point2) -> f32 {
        let mapped = self.apply(src);
        let dx = mapped.x - dst.x;
        let dy = mapped.y - dst.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn scale(&self) -> f64 {
        self.a.hypot(self.b)
    }

    pub fn rotation(&self) -> f64 {
        self.b.atan2(self.a)
    }

    pub fn translation(&self) -> (f64, f64) {
        (self.tx, self.ty)
    }

    /// Inverse mapping; `None` when the scale is zero.
    pub fn inverse(&self) -> Option<Self> {
        let s2 = self.a * self.a + self.b * self.b;
        if s2 < 1e-24 {
            return None;
        }
        let a = self.a / s2;
        let b = -self.b / s2;
        Some(Self {
            a,
            b,
            tx: -(a * self.tx - b * self.ty),
            ty: -(b * self.tx + a * self.ty),
        })
    }

    /// 3x3 homogeneous matrix, row major.
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.a, -self.b, self.tx],
            [self.b, self.a, self.ty],
            [0.0, 0.0, 1.0],
        ]
    }
}

pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，DXF 坐标统一按双精度处理。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    /// 二维向量，用于平移量与指针位移。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        pub const ZERO: Vector2 = Vector2(DVec2::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl std::ops::Add for Vector2 {
        type Output = Vector2;

        fn add(self, rhs: Vector2) -> Vector2 {
            Vector2(self.0 + rhs.0)
        }
    }

    /// 轴对齐边界框，用于计算图纸范围与投影比例。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        /// 对一组点求包围盒；点集为空时返回 `None`。
        pub fn from_points<I>(points: I) -> Option<Self>
        where
            I: IntoIterator<Item = Point2>,
        {
            let mut bounds = Self::empty();
            for point in points {
                bounds.include_point(point);
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        #[inline]
        pub fn area(&self) -> f64 {
            self.width() * self.height()
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            // 先减半再相加，避免接近 f64::MAX 的坐标溢出
            let center = self.min.as_vec2() * 0.5 + self.max.as_vec2() * 0.5;
            Point2::from_vec(center)
        }
    }

    /// 鞋带公式计算多边形面积，顶点不足三个时返回 0。
    /// 首尾顶点隐式相连，仅用于面积统计。
    pub fn polygon_area(points: &[Point2]) -> f64 {
        if points.len() < 3 {
            return 0.0;
        }
        let mut twice_area = 0.0;
        for (index, current) in points.iter().enumerate() {
            let next = points[(index + 1) % points.len()];
            twice_area += current.x() * next.y() - next.x() * current.y();
        }
        twice_area.abs() / 2.0
    }
}

pub mod drawing {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2, polygon_area};

    /// 允许保留的图层：板材轮廓（`0`、`work_area`）与零件（`details`）。
    pub const ALLOWED_LAYERS: [&str; 3] = ["0", "work_area", "details"];

    #[inline]
    pub fn is_allowed_layer(name: &str) -> bool {
        ALLOWED_LAYERS.contains(&name)
    }

    /// 图层在裁切图中的角色，决定渲染样式与统计归类。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum LayerRole {
        /// 板材 / 工作区外轮廓。
        Boundary,
        /// 单个切割零件。
        Detail,
        Other,
    }

    impl LayerRole {
        pub fn of(layer: &str) -> Self {
            match layer {
                "0" | "work_area" => LayerRole::Boundary,
                "details" => LayerRole::Detail,
                _ => LayerRole::Other,
            }
        }

        pub fn label(self) -> &'static str {
            match self {
                LayerRole::Boundary => "boundary",
                LayerRole::Detail => "detail",
                LayerRole::Other => "other",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum EntityKind {
        Polyline,
    }

    impl EntityKind {
        pub fn as_str(self) -> &'static str {
            match self {
                EntityKind::Polyline => "polyline",
            }
        }
    }

    /// 从 LWPOLYLINE 提取出的实体。顶点顺序即绘制顺序。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Entity {
        pub kind: EntityKind,
        pub layer: String,
        pub vertices: Vec<Point2>,
        /// 组码 90 声明的顶点数，仅作参考。
        pub declared_vertex_count: Option<u32>,
    }

    impl Entity {
        pub fn polyline(layer: impl Into<String>, vertices: Vec<Point2>) -> Self {
            Self {
                kind: EntityKind::Polyline,
                layer: layer.into(),
                vertices,
                declared_vertex_count: None,
            }
        }

        #[inline]
        pub fn role(&self) -> LayerRole {
            LayerRole::of(&self.layer)
        }

        /// 至少两个顶点才能形成可见路径。
        #[inline]
        pub fn is_renderable(&self) -> bool {
            self.vertices.len() >= 2
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            Bounds2D::from_points(self.vertices.iter().copied())
        }

        pub fn area(&self) -> f64 {
            polygon_area(&self.vertices)
        }
    }

    /// 一次解析得到的实体集合，保持发现顺序。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct Drawing {
        entities: Vec<Entity>,
    }

    impl Drawing {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn from_entities(entities: Vec<Entity>) -> Self {
            Self { entities }
        }

        pub fn push(&mut self, entity: Entity) {
            self.entities.push(entity);
        }

        #[inline]
        pub fn entities(&self) -> &[Entity] {
            &self.entities
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        pub fn vertex_count(&self) -> usize {
            self.entities.iter().map(|entity| entity.vertices.len()).sum()
        }

        /// 所有实体所有顶点的包围盒；没有任何顶点时返回 `None`。
        pub fn bounds(&self) -> Option<Bounds2D> {
            Bounds2D::from_points(
                self.entities
                    .iter()
                    .flat_map(|entity| entity.vertices.iter().copied()),
            )
        }

        /// `min_waste_area` 为可再利用余料的面积下限。
        pub fn statistics(&self, min_waste_area: f64) -> DrawingStatistics {
            DrawingStatistics::compute(self, min_waste_area)
        }
    }

    /// 余料面积超过该值时视为可再利用。
    pub const DEFAULT_MIN_WASTE_AREA: f64 = 100.0;

    /// 裁切图的材料利用统计。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct DrawingStatistics {
        pub total_area: f64,
        pub sheet_count: usize,
        pub piece_count: usize,
        pub pieces_area: f64,
        /// 包围盒面积减去零件面积。
        pub waste_area: f64,
        pub waste_percentage: f64,
        pub average_piece_area: f64,
        pub is_utilizable: bool,
    }

    impl DrawingStatistics {
        pub fn compute(drawing: &Drawing, min_waste_area: f64) -> Self {
            let total_area = drawing.bounds().map(|b| b.area()).unwrap_or(0.0);
            let mut sheet_count = 0;
            let mut piece_count = 0;
            let mut pieces_area = 0.0;
            for entity in drawing.entities() {
                match entity.role() {
                    LayerRole::Boundary => sheet_count += 1,
                    LayerRole::Detail => {
                        piece_count += 1;
                        pieces_area += entity.area();
                    }
                    LayerRole::Other => {}
                }
            }

            let waste_area = total_area - pieces_area;
            let waste_percentage = if total_area > 0.0 {
                waste_area / total_area * 100.0
            } else {
                0.0
            };
            let average_piece_area = if piece_count > 0 {
                pieces_area / piece_count as f64
            } else {
                0.0
            };

            Self {
                total_area,
                sheet_count,
                piece_count,
                pieces_area,
                waste_area,
                waste_percentage,
                average_piece_area,
                is_utilizable: waste_area > min_waste_area,
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use crate::geometry::{Bounds2D, Point2, Vector2, polygon_area};

    #[test]
    fn polygon_area_uses_shoelace_formula() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        assert!((polygon_area(&square) - 100.0).abs() < 1e-9);

        let reversed: Vec<_> = square.iter().rev().copied().collect();
        assert!((polygon_area(&reversed) - 100.0).abs() < 1e-9);

        assert_eq!(polygon_area(&square[..2]), 0.0);
    }

    #[test]
    fn bounds_grow_with_points() {
        let mut bounds = Bounds2D::empty();
        assert!(bounds.is_empty());
        bounds.include_point(Point2::new(3.0, -1.0));
        bounds.include_point(Point2::new(-2.0, 4.0));
        assert_eq!(bounds.min(), Point2::new(-2.0, -1.0));
        assert_eq!(bounds.max(), Point2::new(3.0, 4.0));
        assert!((bounds.width() - 5.0).abs() < 1e-9);
        assert!((bounds.area() - 25.0).abs() < 1e-9);
        assert!(Bounds2D::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn drag_deltas_accumulate() {
        let start = Point2::new(1.0, 2.0);
        let delta = start.vector_to(Point2::new(4.0, 0.0));
        assert_eq!(delta, Vector2::new(3.0, -2.0));
        assert_eq!(Vector2::ZERO + delta + delta, Vector2::new(6.0, -4.0));
    }
}

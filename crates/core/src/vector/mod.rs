//! Vector geometries and features
//!
//! [`Geometry`] pairs one of the supported [`Shape`]s with the CRS its
//! coordinates are expressed in. There is no ambient CRS: moving a geometry
//! into another CRS is an explicit [`Geometry::reprojected`] call.

use crate::bbox::BoundingBox;
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::transform::CoordinateTransform;
use geo_types::{Coord, LineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The geometry kinds gridzone can rasterize
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Point<f64>),
    MultiPoint(MultiPoint<f64>),
    LineString(LineString<f64>),
    /// Exterior ring plus optional holes
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl Shape {
    /// Name of the variant, for logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Point(_) => "Point",
            Shape::MultiPoint(_) => "MultiPoint",
            Shape::LineString(_) => "LineString",
            Shape::Polygon(_) => "Polygon",
            Shape::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Every vertex, rings included
    pub fn coords(&self) -> Vec<Coord<f64>> {
        match self {
            Shape::Point(p) => vec![p.0],
            Shape::MultiPoint(mp) => mp.0.iter().map(|p| p.0).collect(),
            Shape::LineString(ls) => ls.0.clone(),
            Shape::Polygon(poly) => polygon_coords(poly).collect(),
            Shape::MultiPolygon(mp) => mp.0.iter().flat_map(polygon_coords).collect(),
        }
    }

    fn map_coords<F>(&self, f: &F) -> Result<Shape>
    where
        F: Fn(Coord<f64>) -> Result<Coord<f64>>,
    {
        Ok(match self {
            Shape::Point(p) => Shape::Point(Point(f(p.0)?)),
            Shape::MultiPoint(mp) => Shape::MultiPoint(MultiPoint(
                mp.0.iter()
                    .map(|p| f(p.0).map(Point))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Shape::LineString(ls) => Shape::LineString(map_line(ls, f)?),
            Shape::Polygon(poly) => Shape::Polygon(map_polygon(poly, f)?),
            Shape::MultiPolygon(mp) => Shape::MultiPolygon(MultiPolygon(
                mp.0.iter()
                    .map(|poly| map_polygon(poly, f))
                    .collect::<Result<Vec<_>>>()?,
            )),
        })
    }
}

fn polygon_coords(poly: &Polygon<f64>) -> impl Iterator<Item = Coord<f64>> + '_ {
    poly.exterior()
        .0
        .iter()
        .chain(poly.interiors().iter().flat_map(|ring| ring.0.iter()))
        .copied()
}

fn map_line<F>(ls: &LineString<f64>, f: &F) -> Result<LineString<f64>>
where
    F: Fn(Coord<f64>) -> Result<Coord<f64>>,
{
    ls.0.iter()
        .map(|c| f(*c))
        .collect::<Result<Vec<_>>>()
        .map(LineString)
}

fn map_polygon<F>(poly: &Polygon<f64>, f: &F) -> Result<Polygon<f64>>
where
    F: Fn(Coord<f64>) -> Result<Coord<f64>>,
{
    let exterior = map_line(poly.exterior(), f)?;
    let interiors = poly
        .interiors()
        .iter()
        .map(|ring| map_line(ring, f))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// A shape together with the CRS of its coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    shape: Shape,
    crs: Option<CRS>,
}

impl Geometry {
    pub fn new(shape: Shape, crs: Option<CRS>) -> Self {
        Self { shape, crs }
    }

    pub fn point(x: f64, y: f64, crs: CRS) -> Self {
        Self::new(Shape::Point(Point::new(x, y)), Some(crs))
    }

    pub fn multi_point(points: impl IntoIterator<Item = (f64, f64)>, crs: CRS) -> Self {
        let points = points.into_iter().map(|(x, y)| Point::new(x, y)).collect();
        Self::new(Shape::MultiPoint(MultiPoint(points)), Some(crs))
    }

    pub fn polygon(polygon: Polygon<f64>, crs: CRS) -> Self {
        Self::new(Shape::Polygon(polygon), Some(crs))
    }

    pub fn line_string(line: LineString<f64>, crs: CRS) -> Self {
        Self::new(Shape::LineString(line), Some(crs))
    }

    /// Axis-aligned rectangle polygon, handy for clip extents
    pub fn rectangle(bbox: BoundingBox, crs: CRS) -> Self {
        let ring = LineString::from(vec![
            (bbox.min_x, bbox.min_y),
            (bbox.max_x, bbox.min_y),
            (bbox.max_x, bbox.max_y),
            (bbox.min_x, bbox.max_y),
            (bbox.min_x, bbox.min_y),
        ]);
        Self::polygon(Polygon::new(ring, vec![]), crs)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Bounding box in this geometry's CRS; `None` for an empty geometry
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_coords(self.shape.coords().into_iter().map(|c| (c.x, c.y)))
    }

    /// Points of a Point or MultiPoint geometry, in order
    pub fn points(&self) -> Result<Vec<Point<f64>>> {
        match &self.shape {
            Shape::Point(p) => Ok(vec![*p]),
            Shape::MultiPoint(mp) => Ok(mp.0.clone()),
            other => Err(Error::invalid_parameter(
                "geometry",
                other.kind(),
                "expected Point or MultiPoint",
            )),
        }
    }

    /// Copy of this geometry with every vertex moved into `target`.
    ///
    /// Equivalent CRS short-circuit to a clone. A geometry without a CRS
    /// cannot be reprojected.
    pub fn reprojected(&self, target: &CRS, transform: &dyn CoordinateTransform) -> Result<Geometry> {
        let source = self.crs.as_ref().ok_or(Error::CrsUndefined("geometry"))?;
        if source.is_equivalent(target) {
            return Ok(self.clone());
        }

        tracing::trace!(kind = self.shape.kind(), from = %source, to = %target, "reprojecting geometry");
        let shape = self.shape.map_coords(&|c: Coord<f64>| {
            let (x, y) = transform.transform(c.x, c.y, source, target)?;
            Ok(Coord { x, y })
        })?;
        Ok(Geometry::new(shape, Some(target.clone())))
    }
}

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A geometry with attributes, as handed over by a vector reader
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: HashMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: HashMap::new(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

//! Display surface abstraction (the map's entity collection).
//!
//! The surface is an ordered, index-addressed collection. It offers no stable
//! handles: every `insert_at` / `remove_at` shifts the positions of everything
//! after it, so callers must keep their own index bookkeeping.

use serde::{Deserialize, Serialize};
use crate::error::EnvError;
use crate::types::{EntityId, GeoPoint};

/// Icon options for a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub icon: String,
    pub width: u32,
    pub height: u32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            icon: "assets/img/carIcon_smaller.png".to_string(),
            width: 40,
            height: 40,
        }
    }
}

/// Stroke options for a polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStyle {
    /// Hex color, e.g. `#4caf50`
    pub stroke_color: String,
    pub stroke_thickness: u32,
}

impl PathStyle {
    pub fn new(stroke_color: &str, stroke_thickness: u32) -> Self {
        Self {
            stroke_color: stroke_color.to_string(),
            stroke_thickness,
        }
    }
}

/// Single-point object showing an entity's current position.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Entity this marker belongs to (click target)
    pub owner: EntityId,
    /// Tooltip text
    pub label: String,
    pub location: GeoPoint,
    pub style: MarkerStyle,
}

impl Marker {
    pub fn new(owner: EntityId, label: impl Into<String>, location: GeoPoint, style: MarkerStyle) -> Self {
        Self {
            owner,
            label: label.into(),
            location,
            style,
        }
    }

    pub fn set_location(&mut self, location: GeoPoint) {
        self.location = location;
    }
}

/// Poly-line object (an entity's trail, or the trip overlay).
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    /// Entity this trail belongs to; `None` for the trip overlay
    pub owner: Option<EntityId>,
    locations: Vec<GeoPoint>,
    pub style: PathStyle,
}

impl Polyline {
    pub fn new(owner: Option<EntityId>, locations: Vec<GeoPoint>, style: PathStyle) -> Self {
        Self {
            owner,
            locations,
            style,
        }
    }

    pub fn locations(&self) -> &[GeoPoint] {
        &self.locations
    }

    pub fn set_locations(&mut self, locations: Vec<GeoPoint>) {
        self.locations = locations;
    }

    pub fn push_location(&mut self, location: GeoPoint) {
        self.locations.push(location);
    }
}

/// Anything that can occupy a surface slot.
#[derive(Debug, Clone, PartialEq)]
pub enum MapObject {
    Marker(Marker),
    Path(Polyline),
}

impl MapObject {
    pub fn as_marker(&self) -> Option<&Marker> {
        match self {
            MapObject::Marker(m) => Some(m),
            MapObject::Path(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<&Polyline> {
        match self {
            MapObject::Path(p) => Some(p),
            MapObject::Marker(_) => None,
        }
    }

    pub fn as_path_mut(&mut self) -> Option<&mut Polyline> {
        match self {
            MapObject::Path(p) => Some(p),
            MapObject::Marker(_) => None,
        }
    }

    /// Entity owning this object, if any.
    pub fn owner(&self) -> Option<&EntityId> {
        match self {
            MapObject::Marker(m) => Some(&m.owner),
            MapObject::Path(p) => p.owner.as_ref(),
        }
    }

    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MapObject::Marker(_) => "marker",
            MapObject::Path(_) => "path",
        }
    }
}

/// The narrow interface the engine uses against the rendering surface.
///
/// # Index Semantics
///
/// ```text
/// before:  [0: overlay] [1: pin A] [2: trail A] [3: pin B] [4: trail B]
/// remove_at(2), remove_at(1)
/// after:   [0: overlay] [1: pin B] [2: trail B]
/// ```
pub trait DisplaySurface: Send + 'static {
    /// Inserts an object at `index`, shifting later objects up by one.
    ///
    /// `index == len()` is allowed and behaves like `append`.
    fn insert_at(&mut self, index: usize, object: MapObject) -> Result<(), EnvError>;

    /// Removes and returns the object at `index`, shifting later objects down.
    fn remove_at(&mut self, index: usize) -> Option<MapObject>;

    /// Appends an object at the end.
    fn append(&mut self, object: MapObject);

    /// Number of objects on the surface.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the object at `index`.
    fn get(&self, index: usize) -> Option<&MapObject>;

    /// Mutably borrows the object at `index`.
    fn get_mut(&mut self, index: usize) -> Option<&mut MapObject>;
}

/// In-memory display surface.
///
/// Used for headless operation and by the simulation harness.
#[derive(Debug, Default, Clone)]
pub struct VecSurface {
    objects: Vec<MapObject>,
}

impl VecSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// All objects in index order.
    pub fn objects(&self) -> &[MapObject] {
        &self.objects
    }

    /// Number of objects owned by `id`.
    pub fn count_owned_by(&self, id: &EntityId) -> usize {
        self.objects.iter().filter(|o| o.owner() == Some(id)).count()
    }
}

impl DisplaySurface for VecSurface {
    fn insert_at(&mut self, index: usize, object: MapObject) -> Result<(), EnvError> {
        if index > self.objects.len() {
            return Err(EnvError::IndexOutOfRange {
                index,
                len: self.objects.len(),
            });
        }
        self.objects.insert(index, object);
        Ok(())
    }

    fn remove_at(&mut self, index: usize) -> Option<MapObject> {
        if index < self.objects.len() {
            Some(self.objects.remove(index))
        } else {
            None
        }
    }

    fn append(&mut self, object: MapObject) {
        self.objects.push(object);
    }

    fn len(&self) -> usize {
        self.objects.len()
    }

    fn get(&self, index: usize) -> Option<&MapObject> {
        self.objects.get(index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut MapObject> {
        self.objects.get_mut(index)
    }
}

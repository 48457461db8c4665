use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Vehicles, projectiles, item stacks. Carries the object type id.
    Object(i8),
    Mob(i32),
    Player,
}

/// A tracked entity other than ourselves.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: i32,
    pub uuid: Uuid,
    pub kind: EntityKind,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Entity {
    pub fn new(id: i32, uuid: Uuid, kind: EntityKind, x: f64, y: f64, z: f64) -> Self {
        Self {
            id,
            uuid,
            kind,
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
            on_ground: false,
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64, dz: f64) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }
}

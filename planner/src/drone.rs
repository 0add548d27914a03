use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct DroneId(pub u32);

impl std::fmt::Display for DroneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Drone {}", self.0)
    }
}

/// A drone flying at constant speed with a per-round time budget.
///
/// Equality and hashing only look at the id.
#[derive(Debug, Clone, Copy)]
pub struct Drone {
    id: DroneId,
    pub autonomy: f64,
    pub speed: f64,
}

impl Drone {
    pub fn new(id: DroneId, autonomy: f64, speed: f64) -> Self {
        Drone { id, autonomy, speed }
    }

    pub fn id(&self) -> DroneId {
        self.id
    }
}

impl PartialEq for Drone {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Drone {}

impl Hash for Drone {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Drone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Hands out drone ids that are unique within one generator.
#[derive(Debug, Default)]
pub struct DroneIdGen {
    next: u32,
}

impl DroneIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> DroneId {
        let id = DroneId(self.next);
        self.next += 1;
        id
    }

    pub fn drone(&mut self, autonomy: f64, speed: f64) -> Drone {
        Drone::new(self.next_id(), autonomy, speed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn identity_not_value() {
        let mut ids = DroneIdGen::new();
        let a = ids.drone(100.0, 1.0);
        let b = ids.drone(100.0, 1.0);
        assert_ne!(a, b);
        assert_eq!(a, Drone::new(a.id(), 5.0, 2.0));

        let set: HashSet<Drone> = [a, b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn separate_generators_restart() {
        let mut g1 = DroneIdGen::new();
        let mut g2 = DroneIdGen::new();
        assert_eq!(g1.next_id(), DroneId(0));
        assert_eq!(g1.next_id(), DroneId(1));
        assert_eq!(g2.next_id(), DroneId(0));
    }
}

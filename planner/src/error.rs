use survcov_structs::Point;
use thiserror::Error;

use crate::drone::DroneId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanError {
    #[error("target {0} is listed more than once")]
    DuplicateTarget(Point),
    #[error("depot {0} is listed more than once")]
    DuplicateDepot(Point),
    #[error("point {0} is both a target and a depot")]
    TargetIsDepot(Point),
    #[error("point {0} has a non-finite coordinate")]
    NonFinite(Point),
    #[error("dwell time must be finite and non-negative, got {0}")]
    NegativeDwell(f64),
    #[error("point {0} is neither a target nor a depot")]
    UnknownPoint(Point),
    #[error("point {0} is not a depot of the area")]
    UnknownDepot(Point),
    #[error("node index {index} is out of range ({n_nodes} nodes)")]
    NodeOutOfRange { index: usize, n_nodes: usize },
    #[error("no viable path between nodes {0} and {1}")]
    MissingEdge(usize, usize),
    #[error("malformed tour: {0}")]
    MalformedTour(String),
    #[error("drone {drone} has not enough energy to visit any target from depot {depot}")]
    InsufficientEnergy { drone: DroneId, depot: Point },
    #[error("drone {0} has candidate tours from more than one depot")]
    MixedDepots(DroneId),
    #[error("drone {0} is added more than once")]
    DuplicateDrone(DroneId),
    #[error("drone {0} is not part of the solution")]
    UnknownDrone(DroneId),
    #[error("invalid drone {index}: {reason}")]
    BadDrone { index: usize, reason: String },
    #[error("graph is not connected")]
    Disconnected,
    #[error("internal consistency violation: {0}")]
    Internal(String),
}

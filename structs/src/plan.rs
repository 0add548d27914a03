use serde::{Deserialize, Serialize};

use crate::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStrategy {
    /// Score a tour by how many new targets it covers.
    Total,
    /// Score a tour by new targets times the rounds the drone has left.
    #[default]
    Cumulative,
}

impl std::str::FromStr for PlanStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "total" => Ok(PlanStrategy::Total),
            "cumulative" => Ok(PlanStrategy::Cumulative),
            other => Err(format!("unknown strategy \"{}\" (expected total or cumulative)", other)),
        }
    }
}

impl std::fmt::Display for PlanStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStrategy::Total => write!(f, "total"),
            PlanStrategy::Cumulative => write!(f, "cumulative"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub max_rounds: u32,
    #[serde(default)]
    pub strategy: PlanStrategy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            max_rounds: 1,
            strategy: PlanStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub coverage_score: usize,
    pub newly_covered_per_round: Vec<usize>,
    pub drones: Vec<DronePlan>,
    /// Drones (by scenario index) that cannot reach any target from their depot.
    #[serde(default)]
    pub infeasible_drones: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DronePlan {
    pub drone: usize,
    pub depot: Point,
    pub rounds: Vec<PlannedRound>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedRound {
    /// Target indices in visiting order.
    pub targets: Vec<usize>,
    /// Visited coordinates, starting and ending at the depot.
    pub nodes: Vec<Point>,
    pub length: f64,
    pub time: f64,
}

impl Plan {
    pub fn n_rounds(&self) -> usize {
        self.drones.iter().map(|d| d.rounds.len()).max().unwrap_or(0)
    }

    /// Writes a readable summary, one line per drone and round.
    pub fn write_summary(&self, w: &mut impl std::io::Write) -> std::io::Result<()> {
        writeln!(
            w,
            "plan covers {} targets in {} rounds {:?}",
            self.coverage_score,
            self.n_rounds(),
            self.newly_covered_per_round
        )?;
        for d in self.drones.iter() {
            writeln!(w, "drone {} depot {}", d.drone, d.depot)?;
            for (i, r) in d.rounds.iter().enumerate() {
                writeln!(
                    w,
                    "  - round {}: targets {:?} length {:.1} time {:.1}",
                    i + 1,
                    r.targets,
                    r.length,
                    r.time
                )?;
            }
        }
        if !self.infeasible_drones.is_empty() {
            writeln!(w, "infeasible drones {:?}", self.infeasible_drones)?;
        }
        Ok(())
    }

    /// Prints the summary to stderr, keeping stdout free for the JSON plan.
    pub fn print(&self) -> std::io::Result<()> {
        self.write_summary(&mut std::io::stderr().lock())
    }
}

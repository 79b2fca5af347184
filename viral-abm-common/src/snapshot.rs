use serde::{Serialize, Deserialize};

/// Compartment occupied by a lattice position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compartment {
    #[serde(rename = "h")]
    Healthy,
    #[serde(rename = "e")]
    Eclipse,
    #[serde(rename = "i")]
    Infected,
    #[serde(rename = "d")]
    Dead,
    #[serde(rename = "f")]
    Fused,
    /// Outside the lattice radius. Never changes and never counted.
    #[serde(rename = "o")]
    Empty,
}

impl Compartment {
    /// Single-character tag used in serialized grids.
    pub fn tag(self) -> char {
        match self {
            Compartment::Healthy => 'h',
            Compartment::Eclipse => 'e',
            Compartment::Infected => 'i',
            Compartment::Dead => 'd',
            Compartment::Fused => 'f',
            Compartment::Empty => 'o',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'h' => Some(Compartment::Healthy),
            'e' => Some(Compartment::Eclipse),
            'i' => Some(Compartment::Infected),
            'd' => Some(Compartment::Dead),
            'f' => Some(Compartment::Fused),
            'o' => Some(Compartment::Empty),
            _ => None,
        }
    }
}

/// Number of cells in each live compartment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompartmentCounts {
    #[serde(rename = "h")]
    pub healthy: u32,
    #[serde(rename = "e")]
    pub eclipse: u32,
    #[serde(rename = "i")]
    pub infected: u32,
    #[serde(rename = "d")]
    pub dead: u32,
    #[serde(rename = "f")]
    pub fused: u32,
}

impl CompartmentCounts {
    /// Tallies every live compartment in `cells`; `Empty` is skipped.
    pub fn tally<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = &'a Compartment>,
    {
        let mut counts = CompartmentCounts::default();
        for &cell in cells {
            counts.increment(cell);
        }
        counts
    }

    pub fn increment(&mut self, compartment: Compartment) {
        match compartment {
            Compartment::Healthy => self.healthy += 1,
            Compartment::Eclipse => self.eclipse += 1,
            Compartment::Infected => self.infected += 1,
            Compartment::Dead => self.dead += 1,
            Compartment::Fused => self.fused += 1,
            Compartment::Empty => {}
        }
    }

    pub fn get(&self, compartment: Compartment) -> u32 {
        match compartment {
            Compartment::Healthy => self.healthy,
            Compartment::Eclipse => self.eclipse,
            Compartment::Infected => self.infected,
            Compartment::Dead => self.dead,
            Compartment::Fused => self.fused,
            Compartment::Empty => 0,
        }
    }

    /// Sum over all compartments. Equals the number of active cells.
    pub fn total(&self) -> u32 {
        self.healthy + self.eclipse + self.infected + self.dead + self.fused
    }
}

/// A snapshot of the lattice at a requested time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The time the caller asked for. Can sit slightly past the step-quantized clock.
    pub time: f64,
    /// Row-major compartment tags for the full square index space, `Empty` included.
    pub grid: Vec<Vec<Compartment>>,
    pub counts: CompartmentCounts,
}

impl Snapshot {
    /// Renders the grid as one string of tags per row.
    pub fn grid_rows(&self) -> Vec<String> {
        self.grid
            .iter()
            .map(|row| row.iter().map(|c| c.tag()).collect())
            .collect()
    }
}

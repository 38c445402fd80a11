/// Identifies one issued request of a flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Generation(u64);

/// Tracks the latest request of a flow so that late responses from
/// superseded or abandoned requests can be recognised and dropped.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
    in_flight: bool,
}

impl RequestTracker {
    pub fn issue(&mut self) -> Generation {
        self.latest += 1;
        self.in_flight = true;
        Generation(self.latest)
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.in_flight && generation.0 == self.latest
    }

    /// Marks `generation` complete. Returns false for stale or repeated completions.
    pub fn settle(&mut self, generation: Generation) -> bool {
        if self.is_current(generation) {
            self.in_flight = false;
            true
        } else {
            false
        }
    }

    pub fn abandon(&mut self) {
        self.in_flight = false;
    }
}

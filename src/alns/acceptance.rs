use crate::utils::Random;
use rand::Rng;

/// Metropolis acceptance with geometric cooling.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing {
    temperature: f64,
    cooling_rate: f64,
}

impl SimulatedAnnealing {
    pub fn new(initial_temperature: f64, cooling_rate: f64) -> Self {
        Self {
            temperature: initial_temperature,
            cooling_rate,
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Improvements are always accepted; a worse candidate with probability
    /// `exp((current - candidate) / temperature)`. A cold criterion rejects every worse move.
    pub fn accept(&self, current_objective: f64, candidate_objective: f64, rng: &mut Random) -> bool {
        if candidate_objective < current_objective {
            return true;
        }
        if self.temperature <= 0.0 {
            return false;
        }
        let delta = current_objective - candidate_objective;
        rng.gen_range(0.0..1.0f64) < (delta / self.temperature).exp()
    }

    pub fn cool(&mut self) {
        self.temperature *= self.cooling_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::create_seeded_rng;

    #[test]
    fn zero_temperature_only_accepts_improvements() {
        let (_, mut rng) = create_seeded_rng(Some(3));
        let criterion = SimulatedAnnealing::new(0.0, 0.9);
        assert!(criterion.accept(10.0, 9.0, &mut rng));
        assert!(!criterion.accept(10.0, 10.5, &mut rng));
    }

    #[test]
    fn hot_criterion_accepts_slightly_worse_moves() {
        let (_, mut rng) = create_seeded_rng(Some(3));
        let criterion = SimulatedAnnealing::new(1e12, 0.9);
        assert!((0..20).all(|_| criterion.accept(10.0, 10.5, &mut rng)));
    }

    #[test]
    fn cooling_is_geometric() {
        let mut criterion = SimulatedAnnealing::new(100.0, 0.5);
        criterion.cool();
        criterion.cool();
        assert!((criterion.temperature() - 25.0).abs() < 1e-12);
    }
}

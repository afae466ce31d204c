use serde::{Deserialize, Serialize};

/// A learning rate schedule, maps an epoch into the factor the base learning rate is scaled by.
pub trait LrSchedule {
    fn factor(&self, epoch: usize) -> f32;
}

/// Decays the learning rate by `gamma` once every milestone epoch is reached.
#[derive(Debug, Clone)]
pub struct MultiStep {
    milestones: Vec<usize>,
    gamma: f32,
}

impl MultiStep {
    pub fn new(milestones: Vec<usize>, gamma: f32) -> Self {
        Self { milestones, gamma }
    }
}

impl LrSchedule for MultiStep {
    fn factor(&self, epoch: usize) -> f32 {
        let reached = self.milestones.iter().filter(|&&m| m <= epoch).count();
        self.gamma.powi(reached as i32)
    }
}

/// The `1 / (alfa * t)` schedule, `t` being the epoch.
#[derive(Debug, Clone, Copy)]
pub struct Optimal {
    alfa: f32,
}

impl Optimal {
    pub fn new(alfa: f32) -> Self {
        Self { alfa }
    }
}

impl LrSchedule for Optimal {
    fn factor(&self, epoch: usize) -> f32 {
        if epoch == 0 {
            return 1.;
        }

        1. / (self.alfa * epoch as f32)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Constant;

impl LrSchedule for Constant {
    fn factor(&self, _epoch: usize) -> f32 {
        1.
    }
}

/// The specification for the `LrSchedule` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleSpec {
    MultiStep { milestones: Vec<usize>, gamma: f32 },
    Optimal { alfa: f32 },
    Constant,
}

impl ScheduleSpec {
    pub fn build(&self) -> Box<dyn LrSchedule> {
        match self {
            ScheduleSpec::MultiStep { milestones, gamma } => {
                Box::new(MultiStep::new(milestones.clone(), *gamma))
            }
            ScheduleSpec::Optimal { alfa } => Box::new(Optimal::new(*alfa)),
            ScheduleSpec::Constant => Box::new(Constant),
        }
    }
}

impl Default for ScheduleSpec {
    fn default() -> Self {
        ScheduleSpec::MultiStep {
            milestones: vec![50, 75],
            gamma: 0.1,
        }
    }
}
